/// Traits and helpers for widget-level styles derived from our theme.

/// Provide a per-widget override API.
pub trait Styled {
    type Style: Clone;
    fn styled(self, style: Self::Style) -> Self;
}
