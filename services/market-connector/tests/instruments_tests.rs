//! Symbol registry loading and lookup behavior

use market_connector::{InstrumentType, SymbolRegistry};
use std::io::Write;
use std::path::Path;

fn write_master(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const MASTER: &str = "\
symbol_id,name,isin,type,tick_size,lot_size,upper_circuit,lower_circuit
1,RELIANCE,INE002A01018,EQUITY,0.05,1,3000.0,1500.0
2,TCS,INE467B01029,EQUITY,0.05,1,4500.0,2250.0
4,NIFTY,NIFTY50,INDEX,0.05,1,25000.0,15000.0
10,NIFTY24AUGFUT,NIFTYFUT,FUTURE,0.05,25,26000.0,14000.0
";

#[test]
fn loads_master_and_indexes_both_ways() {
    let file = write_master(MASTER);
    let mut registry = SymbolRegistry::new();

    assert!(registry.load_master(file.path()));
    assert_eq!(registry.len(), 4);

    let reliance = registry.by_id(1).unwrap();
    assert_eq!(reliance.symbol_name, "RELIANCE");
    assert_eq!(reliance.isin, "INE002A01018");
    assert_eq!(reliance.instrument_type, InstrumentType::Equity);
    assert_eq!(reliance.tick_size, 0.05);

    let nifty = registry.by_name("NIFTY").unwrap();
    assert_eq!(nifty.symbol_id, 4);
    assert_eq!(nifty.instrument_type, InstrumentType::Index);

    let fut = registry.by_name("NIFTY24AUGFUT").unwrap();
    assert_eq!(fut.instrument_type, InstrumentType::Future);
    assert_eq!(fut.lot_size, 25);
}

#[test]
fn id_and_name_maps_agree() {
    let file = write_master(MASTER);
    let mut registry = SymbolRegistry::new();
    assert!(registry.load_master(file.path()));

    for id in [1u64, 2, 4, 10] {
        let name = registry.name_of(id);
        assert!(!name.is_empty());
        assert_eq!(registry.id_of(name), id);
    }
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let master = "\
symbol_id,name,isin,type,tick_size,lot_size,upper_circuit,lower_circuit
1,RELIANCE,INE002A01018,EQUITY,0.05,1,3000.0,1500.0
2,TCS,INE467B01029
not-a-number,BROKEN,X,EQUITY,0.05,1,1.0,1.0
3,HDFCBANK,INE040A01034,EQUITY,0.05,1,2000.0,1000.0
";
    let file = write_master(master);
    let mut registry = SymbolRegistry::new();

    assert!(registry.load_master(file.path()));
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.id_of("RELIANCE"), 1);
    assert_eq!(registry.id_of("HDFCBANK"), 3);
    assert_eq!(registry.id_of("TCS"), 0);
}

#[test]
fn unknown_instrument_type_defaults_to_equity() {
    let master = "\
symbol_id,name,isin,type,tick_size,lot_size,upper_circuit,lower_circuit
7,MYSTERY,ISIN007,WARRANT,0.05,1,100.0,50.0
";
    let file = write_master(master);
    let mut registry = SymbolRegistry::new();

    assert!(registry.load_master(file.path()));
    assert_eq!(
        registry.by_name("MYSTERY").unwrap().instrument_type,
        InstrumentType::Equity
    );
}

#[test]
fn missing_file_loads_fallback_set() {
    let mut registry = SymbolRegistry::new();

    assert!(registry.load_master(Path::new("/nonexistent/symbols.csv")));
    assert_eq!(registry.len(), 5);
    assert_eq!(registry.id_of("RELIANCE"), 1);
    assert_eq!(registry.id_of("BANKNIFTY"), 5);
    assert_eq!(
        registry.by_name("NIFTY").unwrap().instrument_type,
        InstrumentType::Index
    );

    // The fallback set is a bijection too
    for id in 1..=5u64 {
        assert_eq!(registry.id_of(registry.name_of(id)), id);
    }
}

#[test]
fn absent_lookups_use_sentinel_values() {
    let mut registry = SymbolRegistry::new();
    assert!(registry.load_master(Path::new("/nonexistent/symbols.csv")));

    assert_eq!(registry.id_of("NO_SUCH_SYMBOL"), 0);
    assert_eq!(registry.name_of(99_999), "");
    assert!(registry.by_id(99_999).is_none());
    assert!(registry.by_name("NO_SUCH_SYMBOL").is_none());
}

#[test]
fn header_only_master_fails_the_load() {
    let file = write_master("symbol_id,name,isin,type,tick_size,lot_size,upper_circuit,lower_circuit\n");
    let mut registry = SymbolRegistry::new();

    assert!(!registry.load_master(file.path()));
    assert!(registry.is_empty());
}

#[test]
fn reload_replaces_previous_contents() {
    let first = write_master(MASTER);
    let mut registry = SymbolRegistry::new();
    assert!(registry.load_master(first.path()));
    assert_eq!(registry.len(), 4);

    let second = write_master(
        "symbol_id,name,isin,type,tick_size,lot_size,upper_circuit,lower_circuit\n\
         42,INFY,INE009A01021,EQUITY,0.05,1,2200.0,1100.0\n",
    );
    assert!(registry.load_master(second.path()));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.id_of("INFY"), 42);
    assert_eq!(registry.id_of("RELIANCE"), 0);
}
