/// What to do when two table records carry the same tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DuplicateTagPolicy {
    /// fail with `MalformedHeader`
    Reject,
    /// the later record replaces the earlier one
    LastWins,
}

/// Knobs for [`Font::parse_with`](crate::Font::parse_with).
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// which font to pick from a `ttcf` collection
    pub collection_index: u32,
    pub duplicate_tags: DuplicateTagPolicy,
    /// compare every table against the checksum stored in its record
    pub verify_checksums: bool,
    /// how many composite levels may nest before giving up
    pub max_composite_depth: usize,
    /// keep assembled outlines around after the first request
    pub cache_outlines: bool,
}

pub const DEFAULT_COMPOSITE_DEPTH: usize = 16;

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            collection_index: 0,
            duplicate_tags: DuplicateTagPolicy::Reject,
            verify_checksums: false,
            max_composite_depth: DEFAULT_COMPOSITE_DEPTH,
            cache_outlines: true,
        }
    }
}

impl ParseOptions {
    pub fn with_collection_index(mut self, index: u32) -> Self {
        self.collection_index = index;
        self
    }
    pub fn with_duplicate_tags(mut self, policy: DuplicateTagPolicy) -> Self {
        self.duplicate_tags = policy;
        self
    }
    pub fn with_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
    pub fn with_max_composite_depth(mut self, depth: usize) -> Self {
        self.max_composite_depth = depth;
        self
    }
    pub fn with_outline_cache(mut self, cache: bool) -> Self {
        self.cache_outlines = cache;
        self
    }
}
