//! Row selection masks.

/// One flag per table row; `true` keeps the row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mask(Vec<bool>);

impl Mask {
    pub fn new(flags: Vec<bool>) -> Self {
        Mask(flags)
    }

    /// A mask of `len` copies of `value`
    pub fn filled(len: usize, value: bool) -> Self {
        Mask(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected rows
    pub fn count_selected(&self) -> usize {
        self.0.iter().filter(|&&flag| flag).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<bool> {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<bool>> for Mask {
    fn from(flags: Vec<bool>) -> Self {
        Mask(flags)
    }
}

impl FromIterator<bool> for Mask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Mask(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        let mask = Mask::new(vec![true, false, true]);
        assert_eq!(mask.len(), 3);
        assert_eq!(mask.count_selected(), 2);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![true, false, true]);

        let filled = Mask::filled(4, false);
        assert_eq!(filled.count_selected(), 0);
        assert!(Mask::default().is_empty());

        let collected: Mask = (0..4).map(|i| i % 2 == 0).collect();
        assert_eq!(collected.into_inner(), vec![true, false, true, false]);
    }
}
