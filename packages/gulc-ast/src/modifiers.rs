use bitflags::bitflags;

bitflags! {
    /// Declaration modifier bitset: the eight flags a declaration can carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeclModifiers: u16 {
        const STATIC    = 1 << 0;
        const MUT       = 1 << 1;
        const VOLATILE  = 1 << 2;
        const ABSTRACT  = 1 << 3;
        const VIRTUAL   = 1 << 4;
        const OVERRIDE  = 1 << 5;
        const EXTERN    = 1 << 6;
        const PROTOTYPE = 1 << 7;
    }
}

impl DeclModifiers {
    /// Matches GULC's `Decl::isAnyVirtual`: virtual dispatch applies whenever any
    /// of the three override-related modifiers are present.
    pub fn is_any_virtual(self) -> bool {
        self.intersects(Self::VIRTUAL | Self::ABSTRACT | Self::OVERRIDE)
    }
}

/// Declaration visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Unassigned,
    Public,
    Private,
    Protected,
    Internal,
    ProtectedInternal,
}

/// Type qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Qualifier {
    #[default]
    Unassigned,
    Mut,
    Immut,
}
