/// Failures surfaced by the catalog and its transports.
///
/// `Clone` so one shared listing request can hand the same error to every
/// waiter.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("upstream data error: {0}")]
    UpstreamData(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid species reference: {0}")]
    InvalidReference(String),
    #[error("response parse error: {0}")]
    Parse(String),
}

/// Why a team mutation was ignored. Never fatal.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum TeamRejection {
    #[error("team is already full (6 maximum)")]
    TeamFull,
    #[error("{0} is already in the team")]
    AlreadyInTeam(String),
    #[error("{0} already knows the maximum number of moves")]
    MoveLimitReached(String),
    #[error("{member} cannot learn {move_name}")]
    MoveNotLearnable { member: String, move_name: String },
}
