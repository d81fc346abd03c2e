
/// The size of each page in disk - use 8192 as all major databases
pub(crate) const PAGE_SIZE: usize = 8192;
/// header size of each page
pub(crate) const PAGE_HEADER_SIZE: usize = 32;
pub(crate) const CONTAINER_SORT_SIZE: usize = 100 * PAGE_SIZE;
pub(crate) const PAGE_FREE_LIST_SLOTS: usize = 5;
/// Maximum number of skip-list levels an index node can have.
pub(crate) const MAX_LEVEL_LENGTH: usize = 32;
/// Upper bound on a single index node's serialized size (fixed header +
/// `MAX_LEVEL_LENGTH` prev/next pointers + the largest indexable key),
/// used to size the "needs its own dedicated index page" free-list slot.
pub(crate) const MAX_INDEX_LENGTH: usize = 1400;
/// Largest BSON value LiteDB-style indexes will accept as a key; longer
/// strings/binaries are rejected before an index node is ever created.
pub(crate) const MAX_INDEX_KEY_LENGTH: usize = 1023;
/// Longest allowed index name.
pub(crate) const INDEX_NAME_MAX_LENGTH: usize = 32;
/// Largest BSON document the engine will store: 2047 data blocks' worth of
/// payload, matching the 11-bit block-count field in a document's header.
/// Upper bound on concurrently open transactions (one per thread slot).
pub(crate) const MAX_OPEN_TRANSACTIONS: usize = 100;
/// Total page budget shared across all open transactions before a
/// transaction must flush to make room for another.
pub(crate) const MAX_TRANSACTION_SIZE: u32 = 10_000;
/// Reserved for future per-collection skip-list level heuristics; index
/// nodes currently size their level with a plain coin-flip ladder instead.
pub(crate) const MAX_ITEMS_COUNT: u32 = 1_000_000;
pub(crate) const MAX_DOCUMENT_SIZE: usize = 2047
    * (PAGE_SIZE
        - PAGE_HEADER_SIZE
        - crate::engine::pages::BasePage::SLOT_SIZE
        - crate::engine::data_block::DataBlock::DATA_BLOCK_FIXED_SIZE);
