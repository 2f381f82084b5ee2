use std::ops::ControlFlow;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub index: u64,
    /// Session time of this tick in seconds.
    pub time: f64,
    /// Time until the next tick.
    pub dt: f64,
}

/// Fixed-rate stand-in for a display's frame callback: the callback re-arms
/// itself after every tick until it asks to stop.
#[derive(Debug)]
pub struct FrameLoop {
    fps: u32,
    next_index: u64,
}

impl FrameLoop {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            next_index: 0,
        }
    }

    pub fn interval(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Run ticks strictly in order until `callback` breaks. Returns the
    /// number of ticks delivered.
    pub fn run(&mut self, mut callback: impl FnMut(Tick) -> ControlFlow<()>) -> u64 {
        let start = self.next_index;
        loop {
            let index = self.next_index;
            let tick = Tick {
                index,
                // Derived from the index so rounding never accumulates.
                time: index as f64 / self.fps as f64,
                dt: self.interval(),
            };
            self.next_index += 1;
            if callback(tick).is_break() {
                return self.next_index - start;
            }
        }
    }
}
