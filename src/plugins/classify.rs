// Gadget / portable light classification. The bubble never touches gadget lights.
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightClass {
    Gadget,
    Ordinary,
}

/// Always classified as a gadget, whatever its name.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PortableLight;

/// What a classifier gets to see about a light: its own name, then its ancestors' names.
#[derive(Debug, Default, Clone)]
pub struct LightInfo<'a> {
    pub names: Vec<&'a str>,
    pub portable: bool,
}

pub trait LightClassifier: Send + Sync + 'static {
    fn classify(&self, info: &LightInfo) -> LightClass;
}

/// Case-insensitive prefix table matched against every name in the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct NamePrefixClassifier {
    prefixes: Vec<String>,
}

impl NamePrefixClassifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { prefixes: prefixes.into_iter().map(|p| p.as_ref().to_lowercase()).collect() }
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        let name = name.strip_suffix("(Clone)").unwrap_or(name).trim().to_lowercase();
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

impl LightClassifier for NamePrefixClassifier {
    fn classify(&self, info: &LightInfo) -> LightClass {
        if info.portable || info.names.iter().any(|n| self.matches(n)) {
            LightClass::Gadget
        } else {
            LightClass::Ordinary
        }
    }
}

/// Root and component names of the host's portable gadgets.
pub fn default_gadget_prefixes() -> Vec<String> {
    [
        "lighter", "lantern", "beaconred", "swivellight", "flashlight", "eotlantern",
        "beaconamber", "lightbarcyan", "beaconblue", "lightbarorange", "modernheadlightr",
        "modernheadlightl", "lightbaryellow", "lightbarpurple", "lightbargreen", "lightbarred",
        "lightbarwhite", "headlight", "lightbarblue", "gadgetlight",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Resource)]
pub struct LightClassifierRes(pub Box<dyn LightClassifier>);
impl LightClassifierRes {
    pub fn new(c: impl LightClassifier) -> Self {
        Self(Box::new(c))
    }
    pub fn classify(&self, info: &LightInfo) -> LightClass {
        self.0.classify(info)
    }
}
