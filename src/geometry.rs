use crate::label::YoloLabel;

/// Bounding box in image pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resize handle of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    BottomRight,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Convert a normalized YOLO label into pixels of an `img_w` x `img_h` image
    pub fn from_label(label: &YoloLabel, img_w: u32, img_h: u32) -> Self {
        let (img_w, img_h) = (img_w as f32, img_h as f32);
        Self {
            x: (label.cx - label.w / 2.0) * img_w,
            y: (label.cy - label.h / 2.0) * img_h,
            width: label.w * img_w,
            height: label.h * img_h,
        }
    }

    /// Convert back into a normalized YOLO label
    pub fn to_label(&self, class_id: u32, img_w: u32, img_h: u32) -> YoloLabel {
        let (img_w, img_h) = (img_w as f32, img_h as f32);
        YoloLabel {
            class_id,
            cx: (self.x + self.width / 2.0) / img_w,
            cy: (self.y + self.height / 2.0) / img_h,
            w: self.width / img_w,
            h: self.height / img_h,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        let b = self.normalized();
        px >= b.x && px <= b.right() && py >= b.y && py <= b.bottom()
    }

    /// Same rectangle with non-negative width and height
    pub fn normalized(&self) -> Self {
        let (x1, x2) = (self.x.min(self.right()), self.x.max(self.right()));
        let (y1, y2) = (self.y.min(self.bottom()), self.y.max(self.bottom()));
        Self::from_corners(x1, y1, x2, y2)
    }

    pub fn clamp_to(&self, img_w: u32, img_h: u32) -> Self {
        let b = self.normalized();
        let (w, h) = (img_w as f32, img_h as f32);
        Self::from_corners(
            b.x.clamp(0.0, w),
            b.y.clamp(0.0, h),
            b.right().clamp(0.0, w),
            b.bottom().clamp(0.0, h),
        )
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let a = self.normalized();
        let b = other.normalized();
        let x1 = a.x.max(b.x);
        let y1 = a.y.max(b.y);
        let x2 = a.right().min(b.right());
        let y2 = a.bottom().min(b.bottom());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self::from_corners(x1, y1, x2, y2))
    }

    /// Smallest rectangle covering both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let a = self.normalized();
        let b = other.normalized();
        Self::from_corners(
            a.x.min(b.x),
            a.y.min(b.y),
            a.right().max(b.right()),
            a.bottom().max(b.bottom()),
        )
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let Some(inter) = self.intersection(other) else {
            return 0.0;
        };
        let inter_area = inter.area();
        let union_area = self.normalized().area() + other.normalized().area() - inter_area;
        if union_area <= 0.0 {
            return 0.0;
        }
        inter_area / union_area
    }

    /// Intersection over the smaller of the two areas
    pub fn ios(&self, other: &BoundingBox) -> f32 {
        let Some(inter) = self.intersection(other) else {
            return 0.0;
        };
        let smaller = self.normalized().area().min(other.normalized().area());
        if smaller <= 0.0 {
            return 0.0;
        }
        inter.area() / smaller
    }

    /// Which resize handle lies within `handle` pixels of the point
    pub fn hit_corner(&self, px: f32, py: f32, handle: f32) -> Option<Corner> {
        if (px - self.x).abs() <= handle && (py - self.y).abs() <= handle {
            Some(Corner::TopLeft)
        } else if (px - self.right()).abs() <= handle && (py - self.bottom()).abs() <= handle {
            Some(Corner::BottomRight)
        } else {
            None
        }
    }

    /// The corner that stays put while `corner` is dragged
    pub fn anchor(&self, corner: Corner) -> (f32, f32) {
        let b = self.normalized();
        match corner {
            Corner::TopLeft => (b.right(), b.bottom()),
            Corner::BottomRight => (b.x, b.y),
        }
    }

    /// Box spanned by a fixed anchor and a dragged point, in either order
    pub fn spanning(anchor: (f32, f32), px: f32, py: f32) -> Self {
        Self::from_corners(anchor.0, anchor.1, px, py).normalized()
    }
}
