pub mod fixture;
pub mod status;

pub use fixture::{Fixture, FixtureId, League, StatusInfo, Team};
pub use status::{FixtureStatus, Phase};

/// Wire envelope returned by the upstream fixtures endpoints
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FixturesResponse {
    #[serde(rename = "response", default)]
    pub fixtures: Vec<Fixture>,
    #[serde(default)]
    pub results: Option<usize>,
}
