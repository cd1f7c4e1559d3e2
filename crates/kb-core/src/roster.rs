use crate::{domain::Holder, errors::Error, intent::MAX_CALLBACK_NAME_BYTES, Result};

/// Names shipped with the bot when `KEY_ROSTER` is not set.
pub const DEFAULT_ROSTER: &[&str] = &[
    "Secretaria",
    "Lucas",
    "André",
    "Pâmela",
    "Maria Cecília",
    "Lívia",
    "Loreena",
    "Duda",
    "Maria Fernanda",
    "Jéssica",
    "Manoela",
    "Luara",
    "Enzo",
    "Maria Gabriela",
    "Guilherme",
];

pub const DEFAULT_HOLDER: &str = "Secretaria";

/// Fixed, ordered set of people allowed to hold the key.
///
/// Built once at startup and never mutated afterwards. Always contains its
/// distinguished default holder.
#[derive(Clone, Debug)]
pub struct Roster {
    names: Vec<String>,
    default_idx: usize,
}

impl Roster {
    pub fn new<I, S>(names: I, default_holder: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into().trim().to_string();
            if name.is_empty() {
                return Err(Error::Config("roster contains an empty name".to_string()));
            }
            if name.len() > MAX_CALLBACK_NAME_BYTES {
                return Err(Error::Config(format!(
                    "roster name too long for a button: {name}"
                )));
            }
            if out.contains(&name) {
                return Err(Error::Config(format!("duplicate roster name: {name}")));
            }
            out.push(name);
        }

        let default_holder = default_holder.trim();
        let default_idx = out
            .iter()
            .position(|n| n == default_holder)
            .ok_or_else(|| {
                Error::Config(format!(
                    "default holder {default_holder:?} is not part of the roster"
                ))
            })?;

        Ok(Self {
            names: out,
            default_idx,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Turn a name into a `Holder`, rejecting anyone outside the roster.
    pub fn resolve(&self, name: &str) -> Result<Holder> {
        if self.contains(name) {
            return Ok(Holder(name.to_string()));
        }
        Err(Error::InvalidHolder(name.to_string()))
    }

    pub fn default_holder(&self) -> Holder {
        Holder(self.names[self.default_idx].clone())
    }

    pub fn is_default(&self, holder: &Holder) -> bool {
        holder.as_str() == self.names[self.default_idx]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            names: DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
            default_idx: 0,
        }
    }
}
