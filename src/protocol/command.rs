//! Command definitions
//!
//! A command is a flat list of opaque byte-string tokens.

use bytes::Bytes;

/// Conversion of a command argument into its wire bytes
///
/// Numbers are sent as their decimal text; strings and buffers as-is.
pub trait ToArg {
    fn to_arg(&self) -> Vec<u8>;
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Vec<u8> {
        self.clone()
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Vec<u8> {
        (**self).to_arg()
    }
}

macro_rules! numeric_to_arg {
    ($($ty:ty),*) => {
        $(
            impl ToArg for $ty {
                fn to_arg(&self) -> Vec<u8> {
                    self.to_string().into_bytes()
                }
            }
        )*
    };
}

numeric_to_arg!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// A command ready for serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Verb token(s) followed by arguments
    tokens: Vec<Vec<u8>>,

    /// Number of leading tokens that make up the verb
    verb_len: usize,
}

impl Command {
    /// Create a command from its verb
    ///
    /// Multi-word verbs ("CLIENT SETNAME") are split into separate tokens.
    pub fn new(name: &str) -> Self {
        let tokens: Vec<Vec<u8>> = name
            .split_whitespace()
            .map(|word| word.as_bytes().to_vec())
            .collect();
        let verb_len = tokens.len();
        Self { tokens, verb_len }
    }

    /// Create a command from a verb and a list of arguments
    pub fn with_args<I, A>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToArg,
    {
        let mut command = Self::new(name);
        command.extend(args);
        command
    }

    /// Append one argument
    pub fn arg<A: ToArg>(mut self, arg: A) -> Self {
        self.tokens.push(arg.to_arg());
        self
    }

    /// Append a list of arguments
    pub fn extend<I, A>(&mut self, args: I)
    where
        I: IntoIterator<Item = A>,
        A: ToArg,
    {
        self.tokens.extend(args.into_iter().map(|a| a.to_arg()));
    }

    /// The verb as text (multi-word verbs rejoined with a space)
    pub fn name(&self) -> String {
        self.tokens[..self.verb_len]
            .iter()
            .map(|t| String::from_utf8_lossy(t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All tokens, verb first
    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    /// Arguments only
    pub fn args(&self) -> &[Vec<u8>] {
        &self.tokens[self.verb_len..]
    }

    /// Whether the command has no tokens at all
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
