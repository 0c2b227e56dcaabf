//! IF/ELSE/ENDIF execution state
//!
//! Conceptually a vector of booleans, one per nested conditional, telling
//! whether each level is in its active branch. Individual entries are never
//! observed: only emptiness and "all true" matter, plus toggling the top for
//! OP_ELSE. So only the implied size and the position of the first false entry
//! are stored, making every operation O(1).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionStack {
    /// Size of the implied stack
    stack_size: usize,
    /// Position of the first false entry, or `NO_FALSE` if all true
    first_false_pos: usize,
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionStack {
    const NO_FALSE: usize = usize::MAX;

    pub fn new() -> Self {
        Self {
            stack_size: 0,
            first_false_pos: Self::NO_FALSE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack_size == 0
    }

    pub fn len(&self) -> usize {
        self.stack_size
    }

    /// True when every enclosing branch is active
    pub fn all_true(&self) -> bool {
        self.first_false_pos == Self::NO_FALSE
    }

    pub fn push_back(&mut self, value: bool) {
        if self.first_false_pos == Self::NO_FALSE && !value {
            // First false lands at the current size
            self.first_false_pos = self.stack_size;
        }
        self.stack_size += 1;
    }

    /// Callers must check `is_empty` first
    pub fn pop_back(&mut self) {
        debug_assert!(!self.is_empty());
        self.stack_size -= 1;
        if self.first_false_pos == self.stack_size {
            self.first_false_pos = Self::NO_FALSE;
        }
    }

    /// Callers must check `is_empty` first
    pub fn toggle_top(&mut self) {
        debug_assert!(!self.is_empty());
        if self.first_false_pos == Self::NO_FALSE {
            self.first_false_pos = self.stack_size - 1;
        } else if self.first_false_pos == self.stack_size - 1 {
            self.first_false_pos = Self::NO_FALSE;
        }
        // A false below the top stays the first false; toggling the top is unobservable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stack_is_all_true() {
        let stack = ConditionStack::new();
        assert!(stack.is_empty());
        assert!(stack.all_true());
    }

    #[test]
    fn test_push_pop() {
        let mut stack = ConditionStack::new();
        stack.push_back(true);
        assert!(stack.all_true());
        stack.push_back(false);
        assert!(!stack.all_true());
        stack.push_back(true);
        assert!(!stack.all_true());
        stack.pop_back();
        assert!(!stack.all_true());
        stack.pop_back();
        assert!(stack.all_true());
        stack.pop_back();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut stack = ConditionStack::new();
        stack.push_back(true);
        stack.toggle_top();
        assert!(!stack.all_true());
        stack.toggle_top();
        assert!(stack.all_true());
    }

    #[test]
    fn test_toggle_under_outer_false() {
        let mut stack = ConditionStack::new();
        stack.push_back(false);
        stack.push_back(false);
        stack.toggle_top();
        assert!(!stack.all_true());
        stack.pop_back();
        stack.toggle_top();
        assert!(stack.all_true());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_matches_boolean_vector() {
        // Walk a fixed op sequence against a naive Vec<bool> model
        let ops = [0u8, 1, 2, 0, 2, 3, 2, 1, 3, 2, 3, 3, 0, 2, 3];
        let mut fast = ConditionStack::new();
        let mut naive: Vec<bool> = Vec::new();
        for op in ops {
            match op {
                0 => {
                    fast.push_back(true);
                    naive.push(true);
                }
                1 => {
                    fast.push_back(false);
                    naive.push(false);
                }
                2 if !naive.is_empty() => {
                    fast.toggle_top();
                    let top = naive.last_mut().unwrap();
                    *top = !*top;
                }
                3 if !naive.is_empty() => {
                    fast.pop_back();
                    naive.pop();
                }
                _ => {}
            }
            assert_eq!(fast.all_true(), naive.iter().all(|v| *v));
            assert_eq!(fast.is_empty(), naive.is_empty());
        }
    }
}
