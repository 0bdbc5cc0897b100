/// One sample of typing speed, `t` seconds into a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub t: f64,
    pub wpm: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.wpm)
    }
}

/// Per-second WPM samples of the running session, fed from clock ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WpmSeries {
    points: Vec<TimeSeriesPoint>,
}

impl WpmSeries {
    /// Record `wpm` at `elapsed_secs`. Only the first sample of each whole
    /// second is kept, and nothing is kept before the first second.
    pub fn record(&mut self, elapsed_secs: u64, wpm: u32) {
        let t = elapsed_secs as f64;
        if t > 0.0 && self.points.last().map_or(true, |p| p.t < t) {
            self.points.push(TimeSeriesPoint::new(t, wpm as f64));
        }
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&TimeSeriesPoint> {
        self.points.last()
    }

    pub fn peak_wpm(&self) -> Option<f64> {
        self.points.iter().map(|p| p.wpm).reduce(f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
