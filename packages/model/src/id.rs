use crate::template::Template;
use crc32fast::Hasher;
use std::collections::HashSet;

/// Derive a stable id seed from a template id using CRC32
pub fn get_template_seed(template_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(template_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for blocks, columns, rows and cells
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
    reserved: HashSet<String>,
}

impl IdGenerator {
    pub fn new(template_id: &str) -> Self {
        Self::from_seed(get_template_seed(template_id))
    }

    pub fn from_seed(seed: String) -> Self {
        Self {
            seed,
            count: 0,
            reserved: HashSet::new(),
        }
    }

    /// Generator that never hands out an id already used by `template`
    pub fn for_template(template: &Template) -> Self {
        let mut generator = Self::new(&template.id);
        generator.reserve(template.collect_ids());
        generator
    }

    /// Mark ids as taken
    pub fn reserve<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.reserved.extend(ids);
    }

    /// Generate next sequential id
    pub fn new_id(&mut self) -> String {
        loop {
            self.count += 1;
            let id = format!("{}-{}", self.seed, self.count);
            if self.reserved.insert(id.clone()) {
                return id;
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
