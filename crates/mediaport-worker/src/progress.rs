/// Share of the overall 0-100 scale given to each unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Hashing,
    Ticket,
    Transfer,
    Completion,
}

impl Stage {
    pub const fn range(self) -> (u8, u8) {
        match self {
            Stage::Hashing => (0, 12),
            Stage::Ticket => (12, 25),
            Stage::Transfer => (25, 85),
            Stage::Completion => (85, 100),
        }
    }

    pub const fn start(self) -> u8 {
        self.range().0
    }

    pub const fn end(self) -> u8 {
        self.range().1
    }

    /// Overall percent after `done` of `total` units of this stage. An empty
    /// stage counts as finished.
    pub fn at(self, done: u64, total: u64) -> u8 {
        let (start, end) = self.range();
        if total == 0 {
            return end;
        }
        let span = u64::from(end - start);
        start + (span * done.min(total) / total) as u8
    }
}
