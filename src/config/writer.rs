//! Serializes configuration records back into `gpib.conf` syntax.
//!
//! Output is canonical: every field is written out, boards come before
//! devices, and each keeps its original relative order. Parsing the output
//! yields a configuration equal to the one written.

use super::{DeviceConfig, GpibConfig, InterfaceConfig};
use std::fmt;

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// A string literal, escaped so the lexer reads back the same text.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match c {
                '"' | '\\' => write!(f, "\\{c}")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                c if c.is_control() => write!(f, "\\u{{{:x}}}", u32::from(c))?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")
    }
}

impl fmt::Display for InterfaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "interface {{")?;
        writeln!(f, "\tminor = {}", self.minor)?;
        writeln!(f, "\tboard_type = {}", Quoted(&self.board_type))?;
        if let Some(name) = &self.name {
            writeln!(f, "\tname = {}", Quoted(name))?;
        }
        writeln!(f, "\tpad = {}", self.pad)?;
        writeln!(f, "\tsad = {}", self.sad)?;
        writeln!(f, "\ttimeout = {}", self.timeout)?;
        writeln!(f, "\teos = {:#04x}", self.eos)?;
        writeln!(f, "\tset-reos = {}", yes_no(self.set_reos))?;
        writeln!(f, "\tset-bin = {}", yes_no(self.set_bin))?;
        writeln!(f, "\tset-xeos = {}", yes_no(self.set_xeos))?;
        writeln!(f, "\tset-eot = {}", yes_no(self.set_eot))?;
        writeln!(f, "\tmaster = {}", yes_no(self.master))?;
        write!(f, "}}")
    }
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "device {{")?;
        writeln!(f, "\tminor = {}", self.minor)?;
        writeln!(f, "\tname = {}", Quoted(&self.name))?;
        writeln!(f, "\tpad = {}", self.pad)?;
        writeln!(f, "\tsad = {}", self.sad)?;
        write!(f, "}}")
    }
}

impl fmt::Display for GpibConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks = self
            .interfaces
            .iter()
            .map(|b| b as &dyn fmt::Display)
            .chain(self.devices.iter().map(|d| d as &dyn fmt::Display));
        for (i, block) in blocks.enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
