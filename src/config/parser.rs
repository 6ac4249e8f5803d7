//! Builds typed configuration records from `gpib.conf` tokens.
//!
//! Parsing happens in two steps. First every block is read into a list of
//! raw `key = value` fields, which catches structural mistakes (unbalanced
//! braces, missing `=`, unknown block keywords). Then each block's fields are
//! converted into an [`InterfaceConfig`] or [`DeviceConfig`], which catches
//! unknown or repeated keys, missing required fields and badly typed values.
//!
//! Semantic rules spanning several records (address ranges, dangling devices,
//! duplicates) are left to [`GpibConfig::validate`].

use super::lexer::{tokenize, Token, TokenKind};
use super::{DeviceConfig, GpibConfig, InterfaceConfig, Timeout};
use crate::error::{BlockKind, ConfResult, GpibConfError, Position};
use std::collections::HashMap;
use tracing::trace;

const INTERFACE_KEYS: &[&str] = &[
    "minor",
    "board_type",
    "name",
    "pad",
    "sad",
    "timeout",
    "eos",
    "set-reos",
    "set-bin",
    "set-xeos",
    "set-eot",
    "master",
];

const DEVICE_KEYS: &[&str] = &["minor", "name", "pad", "sad"];

/// Parses configuration text without semantic validation.
pub fn parse(text: &str) -> ConfResult<GpibConfig> {
    let tokens = tokenize(text)?;
    let mut config = GpibConfig::default();
    for block in read_blocks(&tokens)? {
        trace!(kind = %block.kind, line = block.pos.line, "Parsed block");
        match block.kind {
            BlockKind::Interface => config.interfaces.push(block.into_interface()?),
            BlockKind::Device => config.devices.push(block.into_device()?),
        }
    }
    Ok(config)
}

struct RawField {
    value: Token,
    key_pos: Position,
}

struct RawBlock {
    kind: BlockKind,
    pos: Position,
    fields: HashMap<String, RawField>,
}

fn read_blocks(tokens: &[Token]) -> ConfResult<Vec<RawBlock>> {
    let mut blocks = Vec::new();
    let mut iter = tokens.iter();
    let end = tokens
        .last()
        .map(|t| Position::new(t.pos.line, t.pos.column + 1))
        .unwrap_or_default();

    while let Some(token) = iter.next() {
        let kind = match &token.kind {
            TokenKind::Ident(word) if word == "interface" => BlockKind::Interface,
            TokenKind::Ident(word) if word == "device" => BlockKind::Device,
            TokenKind::Ident(word) => {
                return Err(GpibConfError::UnknownBlock {
                    name: word.clone(),
                    pos: token.pos,
                })
            }
            other => return Err(unexpected(token.pos, "a block keyword", other)),
        };

        match iter.next() {
            Some(Token {
                kind: TokenKind::LBrace,
                ..
            }) => {}
            Some(t) => return Err(unexpected(t.pos, "'{'", &t.kind)),
            None => return Err(eof(end, "'{'")),
        }

        let allowed = match kind {
            BlockKind::Interface => INTERFACE_KEYS,
            BlockKind::Device => DEVICE_KEYS,
        };
        let mut fields = HashMap::new();
        loop {
            let key_token = iter.next().ok_or_else(|| eof(end, "'}'"))?;
            let key = match &key_token.kind {
                TokenKind::RBrace => break,
                TokenKind::Ident(key) => key,
                other => return Err(unexpected(key_token.pos, "a key or '}'", other)),
            };

            match iter.next() {
                Some(Token {
                    kind: TokenKind::Equals,
                    ..
                }) => {}
                Some(t) => return Err(unexpected(t.pos, "'='", &t.kind)),
                None => return Err(eof(end, "'='")),
            }

            let value = iter.next().ok_or_else(|| eof(end, "a value"))?;
            if matches!(
                value.kind,
                TokenKind::LBrace | TokenKind::RBrace | TokenKind::Equals
            ) {
                return Err(unexpected(value.pos, "a value", &value.kind));
            }

            if !allowed.contains(&key.as_str()) {
                return Err(GpibConfError::UnknownKey {
                    block: kind,
                    key: key.clone(),
                    pos: key_token.pos,
                });
            }
            if fields.contains_key(key) {
                return Err(GpibConfError::DuplicateKey {
                    block: kind,
                    key: key.clone(),
                    pos: key_token.pos,
                });
            }
            fields.insert(
                key.clone(),
                RawField {
                    value: value.clone(),
                    key_pos: key_token.pos,
                },
            );
        }

        blocks.push(RawBlock {
            kind,
            pos: token.pos,
            fields,
        });
    }
    Ok(blocks)
}

fn unexpected(pos: Position, expected: &str, found: &TokenKind) -> GpibConfError {
    GpibConfError::Syntax {
        pos,
        message: format!("expected {expected}, found {}", found.describe()),
    }
}

fn eof(pos: Position, expected: &str) -> GpibConfError {
    GpibConfError::Syntax {
        pos,
        message: format!("expected {expected}, found end of input"),
    }
}

fn invalid(key: &str, expected: &'static str, token: &Token) -> GpibConfError {
    GpibConfError::InvalidValue {
        key: key.to_string(),
        expected,
        found: token.kind.describe(),
        pos: token.pos,
    }
}

impl RawBlock {
    fn missing(&self, key: &'static str) -> GpibConfError {
        GpibConfError::MissingField {
            block: self.kind,
            key,
            pos: self.pos,
        }
    }

    fn require<T>(
        &self,
        key: &'static str,
        read: impl Fn(&Self, &'static str) -> ConfResult<Option<T>>,
    ) -> ConfResult<T> {
        read(self, key)?.ok_or_else(|| self.missing(key))
    }

    fn int(&self, key: &'static str) -> ConfResult<Option<u64>> {
        let Some(field) = self.fields.get(key) else {
            return Ok(None);
        };
        match &field.value.kind {
            TokenKind::Int { value, .. } => Ok(Some(*value)),
            _ => Err(invalid(key, "an integer", &field.value)),
        }
    }

    fn minor(&self, key: &'static str) -> ConfResult<Option<u32>> {
        let Some(value) = self.int(key)? else {
            return Ok(None);
        };
        u32::try_from(value).map(Some).map_err(|_| {
            invalid(key, "an integer below 2^32", &self.fields[key].value)
        })
    }

    fn address(&self, key: &'static str) -> ConfResult<Option<u8>> {
        let Some(value) = self.int(key)? else {
            return Ok(None);
        };
        u8::try_from(value).map(Some).map_err(|_| {
            let field = &self.fields[key];
            GpibConfError::AddressOutOfRange {
                field: key,
                value: u32::try_from(value).unwrap_or(u32::MAX),
                owner: format!("{} block at {}", self.kind, field.key_pos),
                allowed: if key == "pad" { "0-30" } else { "0 or 96-126" },
            }
        })
    }

    fn byte(&self, key: &'static str) -> ConfResult<Option<u8>> {
        let Some(value) = self.int(key)? else {
            return Ok(None);
        };
        u8::try_from(value)
            .map(Some)
            .map_err(|_| invalid(key, "a byte (0x00-0xff)", &self.fields[key].value))
    }

    fn string(&self, key: &'static str) -> ConfResult<Option<String>> {
        let Some(field) = self.fields.get(key) else {
            return Ok(None);
        };
        match &field.value.kind {
            TokenKind::Str(s) => Ok(Some(s.clone())),
            _ => Err(invalid(key, "a quoted string", &field.value)),
        }
    }

    fn flag(&self, key: &'static str) -> ConfResult<Option<bool>> {
        let Some(field) = self.fields.get(key) else {
            return Ok(None);
        };
        match &field.value.kind {
            TokenKind::Ident(word) if word == "yes" => Ok(Some(true)),
            TokenKind::Ident(word) if word == "no" => Ok(Some(false)),
            _ => Err(invalid(key, "yes or no", &field.value)),
        }
    }

    fn timeout(&self, key: &'static str) -> ConfResult<Option<Timeout>> {
        let Some(field) = self.fields.get(key) else {
            return Ok(None);
        };
        match &field.value.kind {
            TokenKind::Ident(word) => word
                .parse::<Timeout>()
                .map(Some)
                .map_err(|_| invalid(key, "a timeout such as T30s", &field.value)),
            _ => Err(invalid(key, "a timeout such as T30s", &field.value)),
        }
    }

    fn into_interface(self) -> ConfResult<InterfaceConfig> {
        let mut board = InterfaceConfig::new(
            self.require("minor", Self::minor)?,
            self.require("board_type", Self::string)?,
            self.require("pad", Self::address)?,
        );
        board.name = self.string("name")?;
        if let Some(sad) = self.address("sad")? {
            board.sad = sad;
        }
        if let Some(timeout) = self.timeout("timeout")? {
            board.timeout = timeout;
        }
        if let Some(eos) = self.byte("eos")? {
            board.eos = eos;
        }
        if let Some(v) = self.flag("set-reos")? {
            board.set_reos = v;
        }
        if let Some(v) = self.flag("set-bin")? {
            board.set_bin = v;
        }
        if let Some(v) = self.flag("set-xeos")? {
            board.set_xeos = v;
        }
        if let Some(v) = self.flag("set-eot")? {
            board.set_eot = v;
        }
        if let Some(v) = self.flag("master")? {
            board.master = v;
        }
        Ok(board)
    }

    fn into_device(self) -> ConfResult<DeviceConfig> {
        let mut device = DeviceConfig::new(
            self.require("minor", Self::minor)?,
            self.require("name", Self::string)?,
            self.require("pad", Self::address)?,
        );
        if let Some(sad) = self.address("sad")? {
            device.sad = sad;
        }
        Ok(device)
    }
}
