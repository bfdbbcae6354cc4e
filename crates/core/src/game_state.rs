//! Game-state collaborator interface (§6, §4.9): read-only structured data the proxy's embedder
//! supplies. This crate defines only the contract and the record shapes scripts can read through
//! dotted accessors (`destVar.port.class`); the actual TW2002 sector database lives outside this
//! crate's scope.

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortRecord {
    pub exists: bool,
    pub class: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectorRecord {
    pub index: i64,
    pub density: i64,
    pub explored: bool,
    pub beacon: String,
    pub constellation: String,
    pub warps: Vec<i64>,
    pub port: Option<PortRecord>,
}

/// The external game-state collaborator (§6). `getSector` is the only command that reaches
/// through this trait; `CurrentSector()` backs the `CURRENTSECTOR` system constant.
pub trait GameState: Send + Sync {
    fn current_sector(&self) -> i64;
    fn get_sector(&self, index: i64) -> SectorRecord;
}

/// A fixed-table test double, useful for unit tests and the CLI harness where no live game
/// connection exists.
#[derive(Debug, Clone, Default)]
pub struct StaticGameState {
    pub current: i64,
    pub sectors: std::collections::HashMap<i64, SectorRecord>,
}

impl StaticGameState {
    pub fn new(current: i64) -> Self {
        StaticGameState {
            current,
            sectors: std::collections::HashMap::new(),
        }
    }

    pub fn with_sector(mut self, record: SectorRecord) -> Self {
        self.sectors.insert(record.index, record);
        self
    }
}

impl GameState for StaticGameState {
    fn current_sector(&self) -> i64 {
        self.current
    }

    fn get_sector(&self, index: i64) -> SectorRecord {
        self.sectors
            .get(&index)
            .cloned()
            .unwrap_or(SectorRecord { index, ..Default::default() })
    }
}
