/// Bounded cursor over the working set.
///
/// Out-of-range moves are no-ops and report `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    current: usize,
    len: usize,
}

impl Navigator {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { current: 0, len }
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len
    }

    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.len || index == self.current {
            return false;
        }
        self.current = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_are_bounded() {
        let mut nav = Navigator::new(3);
        assert!(!nav.previous());
        assert!(nav.next());
        assert!(nav.next());
        assert!(!nav.next());
        assert_eq!(nav.current(), 2);
        assert!(nav.is_last());
    }

    #[test]
    fn jump_rejects_out_of_range() {
        let mut nav = Navigator::new(5);
        assert!(nav.jump_to(4));
        assert!(!nav.jump_to(5));
        assert!(!nav.jump_to(4));
        assert_eq!(nav.current(), 4);
    }
}
