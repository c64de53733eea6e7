use derive_more::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum ActivityOrder {
    #[default]
    #[display("oldest")]
    Oldest,
    #[display("newest")]
    Newest,
}

impl std::str::FromStr for ActivityOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest" => Ok(ActivityOrder::Oldest),
            "newest" => Ok(ActivityOrder::Newest),
            other => Err(format!("unknown order {other:?}, expected oldest or newest")),
        }
    }
}

/// Optional paging of `GET /api/user/activity/{userId}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityParams {
    pub order: Option<ActivityOrder>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl ActivityParams {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(order) = self.order {
            pairs.push(("order", order.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}
