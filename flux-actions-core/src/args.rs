//! Typed argument tuples carried by actions

use std::fmt::Display;

/// The fixed parameter list of an action.
///
/// Every action has exactly one argument type, chosen when it is defined.
/// Implemented for `()` and for tuples of up to six elements whose members
/// implement [`Display`], which is how they are rendered into log messages.
///
/// # Example
///
/// ```
/// use flux_actions_core::Arguments;
///
/// let args = ("users".to_string(), 3u32);
/// assert_eq!(<(String, u32)>::ARITY, 2);
/// assert_eq!(args.render(), vec!["users".to_string(), "3".to_string()]);
/// ```
pub trait Arguments: 'static {
    /// Number of positional arguments
    const ARITY: usize;

    /// Render each argument for diagnostics, in positional order
    fn render(&self) -> Vec<String>;
}

impl Arguments for () {
    const ARITY: usize = 0;

    fn render(&self) -> Vec<String> {
        Vec::new()
    }
}

macro_rules! impl_arguments {
    ($arity:expr; $($ty:ident : $idx:tt),+) => {
        impl<$($ty: Display + 'static),+> Arguments for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn render(&self) -> Vec<String> {
                vec![$(self.$idx.to_string()),+]
            }
        }
    };
}

impl_arguments!(1; T0: 0);
impl_arguments!(2; T0: 0, T1: 1);
impl_arguments!(3; T0: 0, T1: 1, T2: 2);
impl_arguments!(4; T0: 0, T1: 1, T2: 2, T3: 3);
impl_arguments!(5; T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
impl_arguments!(6; T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_has_no_arguments() {
        assert_eq!(<()>::ARITY, 0);
        assert!(().render().is_empty());
    }

    #[test]
    fn test_tuple_render_uses_display() {
        let args = ("abc123".to_string(), 7u64, 1.5f32);
        assert_eq!(<(String, u64, f32)>::ARITY, 3);
        assert_eq!(args.render(), vec!["abc123", "7", "1.5"]);
    }

    #[test]
    fn test_single_element_tuple() {
        assert_eq!(<(&'static str,)>::ARITY, 1);
        assert_eq!(("ns.coll",).render(), vec!["ns.coll"]);
    }
}
