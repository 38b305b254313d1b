use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
    };

    pub fn any(self) -> bool {
        self.shift || self.ctrl
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    Replace,
    Subtract,
    Add,
    Intersect,
}

impl SetOp {
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        match (modifiers.shift, modifiers.ctrl) {
            (false, false) => Self::Replace,
            (true, false) => Self::Subtract,
            (false, true) => Self::Add,
            (true, true) => Self::Intersect,
        }
    }

    pub fn apply(self, selection: &mut BTreeSet<String>, items: BTreeSet<String>) {
        match self {
            Self::Replace => *selection = items,
            Self::Subtract => selection.retain(|entity| !items.contains(entity)),
            Self::Add => selection.extend(items),
            Self::Intersect => selection.retain(|entity| items.contains(entity)),
        }
    }
}
