use serde::Serialize;

/// Canonical paginated list shape: the filtered slice plus the total
/// match count and the echoed page/limit.
#[derive(Debug, Serialize)]
pub struct Page<T>
where
    T: Serialize,
{
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Ack { success: true }
    }
}
