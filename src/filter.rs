use serde::{Deserialize, Serialize};

/// Ordered, de-duplicated set of hostnames on which the trigger stays silent.
/// Stored as a plain array; loading goes through [`ExclusionList::add`] so
/// hand-edited entries are normalized and de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExclusionList {
    hosts: Vec<String>,
}

impl From<Vec<String>> for ExclusionList {
    fn from(hosts: Vec<String>) -> Self {
        Self::new(hosts)
    }
}

impl From<ExclusionList> for Vec<String> {
    fn from(list: ExclusionList) -> Self {
        list.hosts
    }
}

impl ExclusionList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for host in hosts {
            list.add(host.as_ref());
        }
        list
    }

    /// Returns false when the entry was empty or already present.
    pub fn add(&mut self, host: &str) -> bool {
        let host = normalize_host(host);
        if host.is_empty() || self.hosts.contains(&host) {
            return false;
        }
        self.hosts.push(host);
        true
    }

    pub fn remove(&mut self, host: &str) -> bool {
        let host = normalize_host(host);
        let before = self.hosts.len();
        self.hosts.retain(|existing| *existing != host);
        self.hosts.len() != before
    }

    pub fn contains(&self, host: &str) -> bool {
        let host = normalize_host(host);
        !host.is_empty() && self.hosts.contains(&host)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Gate consulted on every qualifying selection. The list is replaced
/// whenever the persisted copy changes; nothing is cached per page.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    exclusions: ExclusionList,
}

impl DomainFilter {
    pub fn new(exclusions: ExclusionList) -> Self {
        Self { exclusions }
    }

    pub fn is_excluded(&self, hostname: &str) -> bool {
        self.exclusions.contains(hostname)
    }

    pub fn replace(&mut self, exclusions: ExclusionList) {
        self.exclusions = exclusions;
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }
}

/// Lowercases and strips scheme, credentials, port, path and trailing dot,
/// so `https://Example.com:443/x` and `example.com.` compare equal.
pub fn normalize_host(raw: &str) -> String {
    let mut host = raw.trim();
    if let Some((_, rest)) = host.split_once("://") {
        host = rest;
    }
    if let Some(end) = host.find(['/', '?', '#']) {
        host = &host[..end];
    }
    if let Some((_, rest)) = host.rsplit_once('@') {
        host = rest;
    }
    if let Some((name, port)) = host.rsplit_once(':') {
        if port.chars().all(|c| c.is_ascii_digit()) {
            host = name;
        }
    }
    host.trim_end_matches('.').to_lowercase()
}
