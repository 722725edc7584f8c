/// Seconds a finished recording holds at 100% before rewinding to the start.
pub const SETTLE_DELAY_SECS: f64 = 3.0;

pub fn progress_to_time(progress_percent: f64, duration_seconds: f64) -> f64 {
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    progress_percent.clamp(0.0, 100.0) / 100.0 * duration_seconds
}

pub fn time_to_progress(seconds: f64, duration_seconds: f64) -> f64 {
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    (seconds / duration_seconds * 100.0).clamp(0.0, 100.0)
}

/// Pointer position on the track control, as a progress percentage.
pub fn seek_progress(x: f64, track_start: f64, track_width: f64) -> f64 {
    if track_width <= 0.0 {
        return 0.0;
    }
    ((x - track_start) / track_width * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Playing,
    /// Finished; rewinds to 0 once the remaining settle time elapses.
    Settling { remaining: f64 },
}

/// Playback model decoupled from any audio backend. The rate multiplier
/// scales elapsed wall-clock time only.
#[derive(Debug, Clone)]
pub struct Playback {
    duration_seconds: f64,
    position_seconds: f64,
    rate: f64,
    state: State,
}

impl Playback {
    pub fn new(duration_seconds: f64) -> Self {
        Playback {
            duration_seconds: duration_seconds.max(0.0),
            position_seconds: 0.0,
            rate: 1.0,
            state: State::Idle,
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        if rate > 0.0 {
            self.rate = rate;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == State::Playing
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    pub fn progress(&self) -> f64 {
        time_to_progress(self.position_seconds, self.duration_seconds)
    }

    pub fn play(&mut self) {
        // Restarting a finished recording rewinds immediately.
        if self.progress() >= 100.0 {
            self.position_seconds = 0.0;
        }
        self.state = State::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == State::Playing {
            self.state = State::Idle;
        }
    }

    pub fn seek_to_progress(&mut self, progress_percent: f64) {
        self.position_seconds = progress_to_time(progress_percent, self.duration_seconds);
        if let State::Settling { .. } = self.state {
            self.state = State::Idle;
        }
    }

    // Position moves at wall * rate; the settle countdown runs on wall time.
    pub fn advance(&mut self, wall_seconds: f64) {
        if wall_seconds <= 0.0 {
            return;
        }
        match self.state {
            State::Idle => {}
            State::Playing => {
                self.position_seconds += wall_seconds * self.rate;
                if self.position_seconds >= self.duration_seconds {
                    self.position_seconds = self.duration_seconds;
                    self.state = State::Settling {
                        remaining: SETTLE_DELAY_SECS,
                    };
                }
            }
            State::Settling { remaining } => {
                let left = remaining - wall_seconds;
                if left <= 0.0 {
                    self.position_seconds = 0.0;
                    self.state = State::Idle;
                } else {
                    self.state = State::Settling { remaining: left };
                }
            }
        }
    }
}
