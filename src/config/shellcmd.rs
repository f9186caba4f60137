use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a series of shell commands is written in devbox.json.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmdFormat {
    /// An array of strings, one command per element.
    #[default]
    Array,
    /// A single string, commands separated by newlines.
    String,
}

impl fmt::Display for CmdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmdFormat::Array => f.write_str("array"),
            CmdFormat::String => f.write_str("string"),
        }
    }
}

/// Shell commands written either as a string or as an array of strings.
///
/// Decoding remembers which of the two shapes was used, so serializing
/// writes the commands back the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commands {
    pub marshal_as: CmdFormat,
    pub cmds: Vec<String>,
}

impl Commands {
    /// Appends each line of `script` as a command.
    ///
    /// Leading newlines and trailing whitespace of the script are dropped.
    /// When the first line starts with tabs, that many tabs are removed from
    /// every line that starts with at least as many. Each line also loses
    /// its trailing whitespace.
    pub fn append_script(&mut self, script: &str) {
        let script = script
            .trim_start_matches(&['\r', '\n', ' '][..])
            .trim_end();
        if script.is_empty() {
            return;
        }
        let tabs = script.len() - script.trim_start_matches('\t').len();
        let prefix = &script[..tabs];
        for line in script.split('\n') {
            let line = line.trim_end();
            self.cmds.push(line.strip_prefix(prefix).unwrap_or(line).to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

impl fmt::Display for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cmds.join("\n"))
    }
}

impl Serialize for Commands {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.marshal_as {
            CmdFormat::Array => self.cmds.serialize(serializer),
            CmdFormat::String => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Commands {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CommandsVisitor;

        impl<'de> Visitor<'de> for CommandsVisitor {
            type Value = Commands;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, an array of strings or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Commands, E> {
                Ok(Commands {
                    marshal_as: CmdFormat::String,
                    cmds: vec![v.to_string()],
                })
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Commands, A::Error> {
                let mut cmds = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(cmd) = seq.next_element::<String>()? {
                    cmds.push(cmd);
                }
                Ok(Commands {
                    marshal_as: CmdFormat::Array,
                    cmds,
                })
            }

            fn visit_unit<E: de::Error>(self) -> Result<Commands, E> {
                Ok(Commands::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Commands, E> {
                Ok(Commands::default())
            }
        }

        deserializer.deserialize_any(CommandsVisitor)
    }
}
