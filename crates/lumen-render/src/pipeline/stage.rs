use std::fmt;

/// Fixed draw layers. Lower stages are always drawn first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum RenderStage {
    Background,
    Content,
    Overlay,
    Debug,
}

impl RenderStage {
    /// Every stage, in execution order.
    pub const ALL: [RenderStage; 4] = [
        RenderStage::Background,
        RenderStage::Content,
        RenderStage::Overlay,
        RenderStage::Debug,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Background => "background",
            RenderStage::Content => "content",
            RenderStage::Overlay => "overlay",
            RenderStage::Debug => "debug",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_and_indexed() {
        let mut sorted = RenderStage::ALL;
        sorted.sort();
        assert_eq!(sorted, RenderStage::ALL);
        for (i, s) in RenderStage::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }
}
