#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use bandblur_image as image;

#[doc(inline)]
pub use bandblur_imgproc as imgproc;

#[doc(inline)]
pub use bandblur_io as io;

#[doc(inline)]
pub use bandblur_dist as dist;
