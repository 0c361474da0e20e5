use std::fmt;

/// What the current statement does to a touched object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Creation,
    Modification,
    Deletion,
    Truncation,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Creation => "creation",
            ActionKind::Modification => "modification",
            ActionKind::Deletion => "deletion",
            ActionKind::Truncation => "truncation",
        };
        f.write_str(s)
    }
}
