//! Mutable bitmap capability used to build per-value row sets

use roaring::RoaringBitmap;

/// A bitmap of row ordinals under construction
pub trait MutableBitmap: Send {
    fn add(&mut self, row: u32);
    fn contains(&self, row: u32) -> bool;
    fn cardinality(&self) -> u64;
}

/// Creates empty bitmaps for dictionary columns
pub trait BitmapFactory {
    type Bitmap: MutableBitmap;

    fn make_empty_mutable_bitmap(&self) -> Self::Bitmap;
}

impl MutableBitmap for RoaringBitmap {
    fn add(&mut self, row: u32) {
        self.insert(row);
    }

    fn contains(&self, row: u32) -> bool {
        RoaringBitmap::contains(self, row)
    }

    fn cardinality(&self) -> u64 {
        self.len()
    }
}

/// Factory producing roaring bitmaps
#[derive(Debug, Clone, Copy, Default)]
pub struct RoaringBitmapFactory;

impl BitmapFactory for RoaringBitmapFactory {
    type Bitmap = RoaringBitmap;

    fn make_empty_mutable_bitmap(&self) -> RoaringBitmap {
        RoaringBitmap::new()
    }
}
