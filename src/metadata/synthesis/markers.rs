//! The compiler-generated marker attribute types.

use strum::{EnumIter, IntoStaticStr};

use crate::metadata::wellknown::WellKnownAttributeKind;

/// A marker attribute type the compiler applies on its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr, EnumIter,
)]
pub enum MarkerKind {
    /// `Microsoft.CodeAnalysis.EmbeddedAttribute`, placed on every synthesized marker type
    Embedded,
    /// `System.Runtime.CompilerServices.CompilerGeneratedAttribute`
    CompilerGenerated,
    /// `System.Runtime.CompilerServices.DynamicAttribute`
    Dynamic,
    /// `System.Runtime.CompilerServices.IsReadOnlyAttribute`
    IsReadOnly,
    /// `System.Runtime.CompilerServices.IsByRefLikeAttribute`
    IsByRefLike,
    /// `System.Runtime.CompilerServices.IsUnmanagedAttribute`
    IsUnmanaged,
}

impl MarkerKind {
    /// The well-known kind of the marker's attribute class.
    #[must_use]
    pub fn well_known(self) -> WellKnownAttributeKind {
        match self {
            MarkerKind::Embedded => WellKnownAttributeKind::Embedded,
            MarkerKind::CompilerGenerated => WellKnownAttributeKind::CompilerGenerated,
            MarkerKind::Dynamic => WellKnownAttributeKind::Dynamic,
            MarkerKind::IsReadOnly => WellKnownAttributeKind::IsReadOnly,
            MarkerKind::IsByRefLike => WellKnownAttributeKind::IsByRefLike,
            MarkerKind::IsUnmanaged => WellKnownAttributeKind::IsUnmanaged,
        }
    }

    /// The marker a well-known kind names, if it is one.
    #[must_use]
    pub fn from_well_known(kind: WellKnownAttributeKind) -> Option<MarkerKind> {
        match kind {
            WellKnownAttributeKind::Embedded => Some(MarkerKind::Embedded),
            WellKnownAttributeKind::CompilerGenerated => Some(MarkerKind::CompilerGenerated),
            WellKnownAttributeKind::Dynamic => Some(MarkerKind::Dynamic),
            WellKnownAttributeKind::IsReadOnly => Some(MarkerKind::IsReadOnly),
            WellKnownAttributeKind::IsByRefLike => Some(MarkerKind::IsByRefLike),
            WellKnownAttributeKind::IsUnmanaged => Some(MarkerKind::IsUnmanaged),
            _ => None,
        }
    }

    /// Reflection full name.
    #[must_use]
    pub fn full_name(self) -> &'static str {
        self.well_known().full_name()
    }

    /// Namespace of the marker type.
    #[must_use]
    pub fn namespace(self) -> &'static str {
        let full = self.full_name();
        full.rsplit_once('.').map_or("", |(namespace, _)| namespace)
    }

    /// Simple name of the marker type.
    #[must_use]
    pub fn name(self) -> &'static str {
        let full = self.full_name();
        full.rsplit_once('.').map_or(full, |(_, name)| name)
    }

    /// Whether the marker has a `bool[]` transform-flags constructor besides the
    /// parameterless one.
    #[must_use]
    pub fn has_flags_constructor(self) -> bool {
        matches!(self, MarkerKind::Dynamic)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_split() {
        assert_eq!(MarkerKind::Dynamic.namespace(), "System.Runtime.CompilerServices");
        assert_eq!(MarkerKind::Dynamic.name(), "DynamicAttribute");
        assert_eq!(MarkerKind::Embedded.namespace(), "Microsoft.CodeAnalysis");
        for kind in MarkerKind::iter() {
            assert_eq!(MarkerKind::from_well_known(kind.well_known()), Some(kind));
            assert_eq!(
                format!("{}.{}", kind.namespace(), kind.name()),
                kind.full_name()
            );
        }
    }
}
