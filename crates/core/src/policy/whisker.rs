//! Window-transform rules ("whiskers") and the memory regions they cover.

use std::fmt;

use super::memory::{Memory, NUM_SIGNALS};
use super::PolicyError;

/// Largest window any rule may produce.
///
/// The ceiling is in occupancy units: packets, or bytes for a byte-mode
/// queue, where no rule can hold the window above 1 MB whatever the hard
/// limit is.
pub const MAX_WINDOW: u32 = 1_000_000;

/// Axis-aligned region of the memory space.
///
/// Each signal `i` is covered by the half-open interval
/// `[lower[i], upper[i])`. The unbounded region uses `f64::INFINITY` as upper
/// bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryRange {
    lower: [f64; NUM_SIGNALS],
    upper: [f64; NUM_SIGNALS],
}

impl Default for MemoryRange {
    fn default() -> Self {
        Self::full()
    }
}

impl MemoryRange {
    /// The whole (non-negative) memory space.
    pub fn full() -> Self {
        Self {
            lower: [0.0; NUM_SIGNALS],
            upper: [f64::INFINITY; NUM_SIGNALS],
        }
    }

    pub fn lower(&self) -> &[f64; NUM_SIGNALS] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64; NUM_SIGNALS] {
        &self.upper
    }

    pub fn contains(&self, memory: &Memory) -> bool {
        memory
            .signals()
            .iter()
            .enumerate()
            .all(|(i, v)| *v >= self.lower[i] && *v < self.upper[i])
    }

    /// Whether `pivot` lies strictly inside the range on every signal, so
    /// that splitting there leaves no empty child.
    pub(crate) fn strictly_contains(&self, pivot: &[f64; NUM_SIGNALS]) -> bool {
        pivot
            .iter()
            .enumerate()
            .all(|(i, p)| p.is_finite() && *p > self.lower[i] && *p < self.upper[i])
    }

    /// Sub-range selected by `child_index` when splitting at `pivot`.
    ///
    /// Bit `i` of the index picks the upper half on signal `i`.
    pub(crate) fn child(&self, pivot: &[f64; NUM_SIGNALS], child_index: usize) -> Self {
        let mut child = *self;
        for (i, p) in pivot.iter().enumerate() {
            if child_index & (1 << i) != 0 {
                child.lower[i] = *p;
            } else {
                child.upper[i] = *p;
            }
        }
        child
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for i in 0..NUM_SIGNALS {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{}, {})", self.lower[i], self.upper[i])?;
        }
        write!(f, "}}")
    }
}

/// A single policy rule: maps the previous window to the next one.
///
/// `window(prev) = clamp(prev * window_multiple + window_increment)` where
/// the clamp bounds belong to the rule itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Whisker {
    domain: MemoryRange,
    window_increment: i32,
    window_multiple: f64,
    min_window: u32,
    max_window: u32,
}

impl Default for Whisker {
    /// Identity rule: keeps the previous window.
    fn default() -> Self {
        Self::new(0, 1.0)
    }
}

impl Whisker {
    /// Creates a rule over the full memory space, bounded by `0..=MAX_WINDOW`.
    pub fn new(window_increment: i32, window_multiple: f64) -> Self {
        Self {
            domain: MemoryRange::full(),
            window_increment,
            window_multiple,
            min_window: 0,
            max_window: MAX_WINDOW,
        }
    }

    /// A rule that yields `window` whatever the previous value was.
    pub fn constant(window: u32) -> Self {
        let window = window.min(MAX_WINDOW);
        Self {
            domain: MemoryRange::full(),
            window_increment: i32::try_from(window).unwrap_or(i32::MAX),
            window_multiple: 0.0,
            min_window: window,
            max_window: window,
        }
    }

    /// Restricts the windows this rule may produce to `min..=max`.
    pub fn with_bounds(mut self, min_window: u32, max_window: u32) -> Result<Self, PolicyError> {
        if min_window > max_window || max_window > MAX_WINDOW {
            return Err(PolicyError::InvalidBounds {
                min: min_window,
                max: max_window,
            });
        }
        self.min_window = min_window;
        self.max_window = max_window;
        Ok(self)
    }

    pub(crate) fn with_domain(mut self, domain: MemoryRange) -> Self {
        self.domain = domain;
        self
    }

    /// Applies the rule to the previous window.
    pub fn window(&self, previous: u32) -> u32 {
        let next = f64::from(previous) * self.window_multiple + f64::from(self.window_increment);
        if !next.is_finite() {
            return self.min_window;
        }
        let lo = f64::from(self.min_window);
        let hi = f64::from(self.max_window);
        // clamp in float space first so the cast cannot saturate unexpectedly
        next.clamp(lo, hi).floor() as u32
    }

    pub fn domain(&self) -> &MemoryRange {
        &self.domain
    }

    pub fn window_increment(&self) -> i32 {
        self.window_increment
    }

    pub fn window_multiple(&self) -> f64 {
        self.window_multiple
    }

    pub fn min_window(&self) -> u32 {
        self.min_window
    }

    pub fn max_window(&self) -> u32 {
        self.max_window
    }

    /// Replaces the transform of this rule, keeping its domain.
    pub fn set_transform(&mut self, window_increment: i32, window_multiple: f64) {
        self.window_increment = window_increment;
        self.window_multiple = window_multiple;
    }

    /// Replaces the bounds of this rule, keeping its domain.
    pub fn set_bounds(&mut self, min_window: u32, max_window: u32) -> Result<(), PolicyError> {
        *self = self.clone().with_bounds(min_window, max_window)?;
        Ok(())
    }
}

impl fmt::Display for Whisker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window = {} * prev {:+} in [{}, {}] over {}",
            self.window_multiple,
            self.window_increment,
            self.min_window,
            self.max_window,
            self.domain,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_rule_ignores_previous() {
        let rule = Whisker::constant(3);
        for prev in [0, 1, 3, 17, MAX_WINDOW] {
            assert_eq!(rule.window(prev), 3);
        }
    }

    #[test]
    fn test_default_is_identity() {
        let rule = Whisker::default();
        assert_eq!(rule.window(0), 0);
        assert_eq!(rule.window(42), 42);
    }

    #[test]
    fn test_additive_increase_clamps_to_max() {
        let rule = Whisker::new(5, 1.0).with_bounds(2, 20).unwrap();
        assert_eq!(rule.window(0), 5);
        assert_eq!(rule.window(14), 19);
        assert_eq!(rule.window(19), 20);
        assert_eq!(rule.window(20), 20);
    }

    #[test]
    fn test_multiplicative_decrease_clamps_to_min() {
        let rule = Whisker::new(-1, 0.5).with_bounds(4, 100).unwrap();
        assert_eq!(rule.window(100), 49);
        assert_eq!(rule.window(9), 4);
        assert_eq!(rule.window(0), 4);
    }

    #[test]
    fn test_window_never_leaves_bounds_on_iteration() {
        let rules = [
            Whisker::new(7, 1.3).with_bounds(3, 500).unwrap(),
            Whisker::new(-50, 0.2).with_bounds(1, 64).unwrap(),
            Whisker::new(i32::MAX, 1000.0).with_bounds(10, 11).unwrap(),
        ];
        let mut window = 0;
        for step in 0..300 {
            let rule = &rules[step % rules.len()];
            window = rule.window(window);
            assert!(
                (rule.min_window()..=rule.max_window()).contains(&window),
                "window {window} escaped bounds of {rule}"
            );
        }
    }

    #[test]
    fn test_non_finite_product_falls_to_min() {
        let rule = Whisker::new(0, f64::NAN).with_bounds(6, 10).unwrap();
        assert_eq!(rule.window(3), 6);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(matches!(
            Whisker::new(1, 1.0).with_bounds(10, 2),
            Err(PolicyError::InvalidBounds { min: 10, max: 2 })
        ));
        assert!(Whisker::new(1, 1.0).with_bounds(0, MAX_WINDOW + 1).is_err());
    }

    #[test]
    fn test_full_range_contains_everything_non_negative() {
        let range = MemoryRange::full();
        assert!(range.contains(&Memory::new()));
        assert!(range.contains(&Memory::with_signals([1e9, 0.0, 1e12])));
    }

    #[test]
    fn test_child_ranges_partition_parent() {
        let parent = MemoryRange::full();
        let pivot = [0.5, 1.0, 10.0];
        let point = Memory::with_signals([0.7, 0.2, 10.0]);

        let owners: Vec<_> = (0..1 << NUM_SIGNALS)
            .filter(|idx| parent.child(&pivot, *idx).contains(&point))
            .collect();
        // high on signals 0 and 2, low on signal 1
        assert_eq!(owners, vec![0b101]);
    }
}
