/// Display label for a stored priority code outside 1..=3.
pub const UNKNOWN_PRIORITY_LABEL: &str = "不明";

/// Task priority as shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn code(&self) -> i32 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "高",
            Self::Medium => "中",
            Self::Low => "低",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::High),
            2 => Some(Self::Medium),
            3 => Some(Self::Low),
            _ => None,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "高" => Some(Self::High),
            "中" => Some(Self::Medium),
            "低" => Some(Self::Low),
            _ => None,
        }
    }

    /// Code persisted for a submitted label; unknown labels are stored as 0.
    pub fn code_for_label(label: &str) -> i32 {
        Self::from_label(label).map_or(0, |p| p.code())
    }

    /// Label rendered for a stored code.
    pub fn label_for_code(code: i32) -> &'static str {
        Self::from_code(code).map_or(UNKNOWN_PRIORITY_LABEL, |p| p.label())
    }
}
