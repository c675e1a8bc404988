//! Declarative mapping from typed option fields to command-line tokens.
//!
//! Every options type is declared once with [`command_options!`], which
//! records the program name, where the program lives, optional fixed leading
//! tokens, and an ordered list of `field => "--flag"` (or `=> positional`)
//! pairs. Serialization visits fields in declaration order; the emission rule
//! comes from the field type:
//!
//! | type | emitted when | tokens |
//! |---|---|---|
//! | `bool` | `true` | flag |
//! | `String`, `PathBuf` | non-empty | flag, value |
//! | integers | non-zero | flag, value |
//! | `Option<T>` | `Some` (even `Some(0)`) | flag, value |
//! | `Vec<String>` | per element | flag, value, flag, value, ... |
//!
//! Positional fields are emitted after all flags.

use std::fmt::Display;
use std::path::PathBuf;

use crate::domain::command::CommandError;

/// Binary directory under an install root (`$GPHOME/bin`)
pub const BIN_DIR: &str = "bin";

/// Where a program is looked up when resolving a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramLocation {
    /// `<install root>/bin/<program>`
    InstallRoot,
    /// Bare program name, resolved through `PATH`
    SystemPath,
}

/// A value that may contribute `flag value` tokens
pub trait FlagArg {
    fn push_flag(&self, flag: &str, args: &mut Vec<String>);
}

/// A value that may contribute positional tokens
pub trait PositionalArg {
    fn push_positional(&self, args: &mut Vec<String>);
}

impl FlagArg for bool {
    fn push_flag(&self, flag: &str, args: &mut Vec<String>) {
        if *self {
            args.push(flag.to_string());
        }
    }
}

impl FlagArg for String {
    fn push_flag(&self, flag: &str, args: &mut Vec<String>) {
        if !self.is_empty() {
            args.push(flag.to_string());
            args.push(self.clone());
        }
    }
}

impl FlagArg for PathBuf {
    fn push_flag(&self, flag: &str, args: &mut Vec<String>) {
        if !self.as_os_str().is_empty() {
            args.push(flag.to_string());
            args.push(self.to_string_lossy().into_owned());
        }
    }
}

impl<T: Display> FlagArg for Option<T> {
    fn push_flag(&self, flag: &str, args: &mut Vec<String>) {
        if let Some(value) = self {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
    }
}

impl FlagArg for Vec<String> {
    fn push_flag(&self, flag: &str, args: &mut Vec<String>) {
        for value in self {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }
}

macro_rules! numeric_flag_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FlagArg for $ty {
                fn push_flag(&self, flag: &str, args: &mut Vec<String>) {
                    if *self != 0 {
                        args.push(flag.to_string());
                        args.push(self.to_string());
                    }
                }
            }
        )*
    };
}

numeric_flag_arg!(u8, u16, u32, u64, usize, i32, i64);

impl PositionalArg for String {
    fn push_positional(&self, args: &mut Vec<String>) {
        if !self.is_empty() {
            args.push(self.clone());
        }
    }
}

impl PositionalArg for PathBuf {
    fn push_positional(&self, args: &mut Vec<String>) {
        if !self.as_os_str().is_empty() {
            args.push(self.to_string_lossy().into_owned());
        }
    }
}

impl PositionalArg for Option<String> {
    fn push_positional(&self, args: &mut Vec<String>) {
        if let Some(value) = self {
            value.push_positional(args);
        }
    }
}

impl PositionalArg for Vec<String> {
    fn push_positional(&self, args: &mut Vec<String>) {
        args.extend(self.iter().filter(|v| !v.is_empty()).cloned());
    }
}

/// An options value that maps onto one external program invocation
pub trait CommandOptions: Send + Sync {
    /// Program file name (`initdb`, `pg_ctl`, `systemctl`)
    fn program(&self) -> &'static str;

    fn location(&self) -> ProgramLocation {
        ProgramLocation::InstallRoot
    }

    /// Every flag token the type declares, in declaration order
    fn declared_flags(&self) -> Vec<&'static str>;

    /// Append tokens for the current field values
    fn push_args(&self, args: &mut Vec<String>);

    /// Serialize to an ordered token list
    ///
    /// # Errors
    /// - CommandError::InvalidOptions if the declaration itself is malformed
    fn to_args(&self) -> Result<Vec<String>, CommandError> {
        validate_declaration(self.program(), &self.declared_flags())?;

        let mut args = Vec::new();
        self.push_args(&mut args);
        Ok(args)
    }
}

/// Check program name and flag tokens of a declaration
pub fn validate_declaration(program: &str, flags: &[&str]) -> Result<(), CommandError> {
    let invalid = |reason: String| CommandError::InvalidOptions {
        program: program.to_string(),
        reason,
    };

    if program.is_empty() {
        return Err(invalid("program name is empty".to_string()));
    }
    if program.contains('/') || program.contains('\\') {
        return Err(invalid(format!(
            "program name '{}' must not contain a path separator",
            program
        )));
    }

    for flag in flags {
        if !flag.starts_with('-') {
            return Err(invalid(format!("flag '{}' must start with '-'", flag)));
        }
        if flag.trim_start_matches('-').is_empty() {
            return Err(invalid(format!("flag '{}' has no name", flag)));
        }
        if flag.chars().any(char::is_whitespace) {
            return Err(invalid(format!("flag '{}' contains whitespace", flag)));
        }
    }

    Ok(())
}

/// Declare an options struct and its argument mapping
///
/// ```ignore
/// command_options! {
///     /// `pg_ctl start`
///     pub struct PgCtlStart => "pg_ctl" ["start"] {
///         pub pg_data: String => "--pgdata",
///         pub wait: bool => "--wait",
///     }
/// }
///
/// command_options! {
///     pub struct Systemctl => "systemctl" in system {
///         pub user: bool => "--user",
///         pub action: String => positional,
///     }
/// }
/// ```
#[macro_export]
macro_rules! command_options {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $program:literal $(in $location:ident)? $([$($lead:literal),* $(,)?])? {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $fty:ty => $kind:tt
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        impl $crate::domain::options::CommandOptions for $name {
            fn program(&self) -> &'static str {
                $program
            }

            fn location(&self) -> $crate::domain::options::ProgramLocation {
                $crate::__program_location!($($location)?)
            }

            fn declared_flags(&self) -> Vec<&'static str> {
                #[allow(unused_mut)]
                let mut flags = Vec::new();
                $( $crate::__collect_flag!($kind, flags); )*
                flags
            }

            fn push_args(&self, args: &mut Vec<String>) {
                $( $( args.push($lead.to_string()); )* )?
                $( $crate::__push_flag_arg!($kind, self.$field, args); )*
                $( $crate::__push_positional_arg!($kind, self.$field, args); )*
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __program_location {
    () => {
        $crate::domain::options::ProgramLocation::InstallRoot
    };
    (system) => {
        $crate::domain::options::ProgramLocation::SystemPath
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __collect_flag {
    (positional, $flags:ident) => {};
    ($flag:literal, $flags:ident) => {
        $flags.push($flag);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __push_flag_arg {
    (positional, $value:expr, $args:ident) => {};
    ($flag:literal, $value:expr, $args:ident) => {
        $crate::domain::options::FlagArg::push_flag(&$value, $flag, $args);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __push_positional_arg {
    (positional, $value:expr, $args:ident) => {
        $crate::domain::options::PositionalArg::push_positional(&$value, $args);
    };
    ($flag:literal, $value:expr, $args:ident) => {};
}
