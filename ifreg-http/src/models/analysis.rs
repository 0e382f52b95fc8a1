use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Query parameters of the top-invocations report
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopQuery {
    /// Number of interfaces to return; defaults to 3, `n <= 0` returns none
    #[serde(default)]
    pub n: Option<i64>,
}

impl TopQuery {
    pub const DEFAULT_N: i64 = 3;

    pub fn n(&self) -> i64 {
        self.n.unwrap_or(Self::DEFAULT_N)
    }
}
