//! Symbol master registry
//!
//! Bidirectional mapping between numeric symbol ids and ticker names,
//! plus per-instrument metadata. Loaded once at startup from the
//! exchange's CSV master; immutable until the next (externally
//! serialized) reload.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

/// Instrument classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentType {
    Equity,
    Future,
    Option,
    Index,
}

impl InstrumentType {
    /// Parse the master-file type column; unknown values fall back to
    /// `Equity` with a logged warning
    fn parse(value: &str) -> Self {
        match value {
            "EQUITY" => Self::Equity,
            "FUTURE" => Self::Future,
            "OPTION" => Self::Option,
            "INDEX" => Self::Index,
            other => {
                warn!(instrument_type = other, "unknown instrument type, defaulting to EQUITY");
                Self::Equity
            }
        }
    }
}

/// One instrument from the symbol master
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol_id: u64,
    pub symbol_name: String,
    pub isin: String,
    pub instrument_type: InstrumentType,
    pub tick_size: f64,
    pub lot_size: u64,
    pub upper_circuit: f64,
    pub lower_circuit: f64,
}

/// Id/name indexed view over the loaded symbol master
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    symbols: Vec<SymbolInfo>,
    by_id: FxHashMap<u64, usize>,
    by_name: FxHashMap<String, usize>,
}

impl SymbolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the symbol master CSV, replacing any previous contents
    ///
    /// Format: `symbol_id,name,isin,type,tick_size,lot_size,
    /// upper_circuit,lower_circuit`, header row skipped. Malformed rows
    /// are skipped with a warning and do not fail the load. If the file
    /// cannot be opened a deterministic fallback set is loaded and the
    /// call still succeeds.
    pub fn load_master(&mut self, path: &Path) -> bool {
        info!(path = %path.display(), "loading symbol master");

        self.symbols.clear();
        self.by_id.clear();
        self.by_name.clear();

        let mut reader = match csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
        {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open symbol master, using fallback set");
                self.symbols = fallback_symbols();
                self.rebuild_indices();
                return true;
            }
        };

        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable symbol master row");
                    continue;
                }
            };
            match parse_row(&record) {
                Some(info) => self.symbols.push(info),
                None => warn!(row = ?record, "skipping malformed symbol master row"),
            }
        }

        self.rebuild_indices();

        if self.symbols.is_empty() {
            error!(path = %path.display(), "symbol master contained no usable rows");
            return false;
        }
        info!(count = self.symbols.len(), "symbol master loaded");
        true
    }

    /// Look up by numeric id
    #[must_use]
    pub fn by_id(&self, symbol_id: u64) -> Option<&SymbolInfo> {
        self.by_id.get(&symbol_id).map(|&i| &self.symbols[i])
    }

    /// Look up by ticker name
    #[must_use]
    pub fn by_name(&self, symbol_name: &str) -> Option<&SymbolInfo> {
        self.by_name.get(symbol_name).map(|&i| &self.symbols[i])
    }

    /// Numeric id for a name; 0 when absent
    #[must_use]
    pub fn id_of(&self, symbol_name: &str) -> u64 {
        self.by_name(symbol_name).map_or(0, |info| info.symbol_id)
    }

    /// Name for a numeric id; empty when absent
    #[must_use]
    pub fn name_of(&self, symbol_id: u64) -> &str {
        self.by_id(symbol_id).map_or("", |info| &info.symbol_name)
    }

    /// Number of loaded instruments
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True before any successful load
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn rebuild_indices(&mut self) {
        for (i, info) in self.symbols.iter().enumerate() {
            self.by_id.insert(info.symbol_id, i);
            self.by_name.insert(info.symbol_name.clone(), i);
        }
    }
}

fn parse_row(record: &csv::StringRecord) -> Option<SymbolInfo> {
    if record.len() < 8 {
        return None;
    }
    Some(SymbolInfo {
        symbol_id: record.get(0)?.trim().parse().ok()?,
        symbol_name: record.get(1)?.trim().to_string(),
        isin: record.get(2)?.trim().to_string(),
        instrument_type: InstrumentType::parse(record.get(3)?.trim()),
        tick_size: record.get(4)?.trim().parse().ok()?,
        lot_size: record.get(5)?.trim().parse().ok()?,
        upper_circuit: record.get(6)?.trim().parse().ok()?,
        lower_circuit: record.get(7)?.trim().parse().ok()?,
    })
}

/// Deterministic instrument set used when the master is unavailable
fn fallback_symbols() -> Vec<SymbolInfo> {
    vec![
        SymbolInfo {
            symbol_id: 1,
            symbol_name: "RELIANCE".to_string(),
            isin: "INE002A01018".to_string(),
            instrument_type: InstrumentType::Equity,
            tick_size: 0.05,
            lot_size: 1,
            upper_circuit: 3000.0,
            lower_circuit: 1500.0,
        },
        SymbolInfo {
            symbol_id: 2,
            symbol_name: "TCS".to_string(),
            isin: "INE467B01029".to_string(),
            instrument_type: InstrumentType::Equity,
            tick_size: 0.05,
            lot_size: 1,
            upper_circuit: 4500.0,
            lower_circuit: 2250.0,
        },
        SymbolInfo {
            symbol_id: 3,
            symbol_name: "HDFCBANK".to_string(),
            isin: "INE040A01034".to_string(),
            instrument_type: InstrumentType::Equity,
            tick_size: 0.05,
            lot_size: 1,
            upper_circuit: 2000.0,
            lower_circuit: 1000.0,
        },
        SymbolInfo {
            symbol_id: 4,
            symbol_name: "NIFTY".to_string(),
            isin: "NIFTY50".to_string(),
            instrument_type: InstrumentType::Index,
            tick_size: 0.05,
            lot_size: 1,
            upper_circuit: 25000.0,
            lower_circuit: 15000.0,
        },
        SymbolInfo {
            symbol_id: 5,
            symbol_name: "BANKNIFTY".to_string(),
            isin: "BANKNIFTY".to_string(),
            instrument_type: InstrumentType::Index,
            tick_size: 0.05,
            lot_size: 1,
            upper_circuit: 50000.0,
            lower_circuit: 30000.0,
        },
    ]
}
