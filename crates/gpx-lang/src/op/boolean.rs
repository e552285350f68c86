use super::{Function, registry::Registry};

impl Registry<bool> {
    /// The boolean connectives `and or not imp xor equ`.
    pub fn boolean() -> Self {
        let mut registry = Registry::new();

        for function in [
            Function::of("and", 2, |v: &[bool]| v[0] && v[1]),
            Function::of("or", 2, |v: &[bool]| v[0] || v[1]),
            Function::of("not", 1, |v: &[bool]| !v[0]),
            Function::of("imp", 2, |v: &[bool]| !v[0] || v[1]),
            Function::of("xor", 2, |v: &[bool]| v[0] ^ v[1]),
            Function::of("equ", 2, |v: &[bool]| v[0] == v[1]),
        ] {
            registry.register(function);
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("and", vec![true, false], false)]
    #[case("or", vec![true, false], true)]
    #[case("not", vec![true], false)]
    #[case("imp", vec![true, false], false)]
    #[case("imp", vec![false, false], true)]
    #[case("xor", vec![true, true], false)]
    #[case("equ", vec![false, false], true)]
    fn test_functions(#[case] name: &str, #[case] args: Vec<bool>, #[case] expected: bool) {
        let registry = Registry::boolean();
        assert_eq!(registry.function(name).unwrap().apply(&args), Ok(expected));
    }
}
