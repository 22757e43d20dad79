pub trait TimeSource {
    /// Nanoseconds since the unix epoch.
    fn unix_nanos(&self) -> i64;
}

#[derive(Clone, Default)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn unix_nanos(&self) -> i64 {
        let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        // Saturates in the year 2262.
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }
}

#[derive(Clone)]
pub struct FixedTime {
    pub nanos: i64,
}

impl TimeSource for FixedTime {
    fn unix_nanos(&self) -> i64 {
        self.nanos
    }
}
