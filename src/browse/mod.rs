//! Geography/Taxonomy Browse (§4.7): country, region, and farm detail pages,
//! origin typeahead, varietal listing, and tasting-note categories — all
//! built on the same filter compiler [`crate::search::filters`] uses, so
//! totals reported here agree with equivalent `search` requests (§8).

pub mod geography;
pub mod tasting_notes;
pub mod varietal;

pub use geography::{country_detail, farm_detail, origin_search, region_detail};
pub use tasting_notes::list as tasting_note_categories;
pub use varietal::{detail as varietal_detail, list as varietal_list};
