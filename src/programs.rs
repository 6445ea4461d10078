//! Built-in program images and inline image parsing.
//!
//! There is no assembler and no program file format: a program is either
//! one of the literal images below or a list of hex bytes typed on the
//! command line.

use thiserror::Error;

/// A named literal program image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pub name: &'static str,
    pub description: &'static str,
    pub image: &'static [u8],
}

/// The built-in program catalogue.
pub const BUILTIN: &[Program] = &[
    Program {
        name: "demo",
        description: "MVCA 16; SUBA 1; JMPZR A,2 (one decrement, then halt)",
        image: &[2, 16, 8, 1, 6, 0, 2],
    },
    Program {
        name: "countdown",
        description: "count A down from 16 to zero with a JMPZR/JMPZ loop",
        image: &[
            2, 16,   // 00: MVCA 16
            8, 1,    // 02: SUBA 1
            6, 0, 10, // 04: JMPZR A,0a
            5, 0, 2, // 07: JMPZ 0,02
            0,       // 0a: HALT
        ],
    },
    Program {
        name: "registers",
        description: "load A, X and Y, then add to A",
        image: &[2, 0x10, 3, 0x20, 4, 0x30, 7, 0x05, 0],
    },
    Program {
        name: "store",
        description: "write four bytes to data memory",
        image: &[1, 0xde, 0x00, 1, 0xad, 0x01, 1, 0xbe, 0x02, 1, 0xef, 0x03, 0],
    },
    Program {
        name: "wrap",
        description: "8-bit wrap-around: 1 - 2 + 3",
        image: &[2, 0x01, 8, 0x02, 7, 0x03, 0],
    },
];

/// Look up a built-in program by name.
pub fn builtin(name: &str) -> Result<&'static Program, ProgramError> {
    BUILTIN
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ProgramError::UnknownProgram(name.to_string()))
}

/// Parse a program image written as hex bytes.
///
/// Bytes are separated by whitespace or commas and may carry a `0x`
/// prefix: `"02 10 00"`, `"0x02,0x10,0x00"`.
pub fn parse_image(text: &str) -> Result<Vec<u8>, ProgramError> {
    let image = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(position, token)| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u8::from_str_radix(digits, 16).map_err(|_| ProgramError::InvalidByte {
                token: token.to_string(),
                position,
            })
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if image.is_empty() {
        return Err(ProgramError::Empty);
    }
    Ok(image)
}

/// Errors from selecting or parsing a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("unknown built-in program '{0}'")]
    UnknownProgram(String),

    #[error("invalid byte '{token}' at position {position}")]
    InvalidByte { token: String, position: usize },

    #[error("program image is empty")]
    Empty,
}
