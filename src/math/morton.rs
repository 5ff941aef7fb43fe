//! Morton (Z-order) addressing for swizzled 2D textures
//!
//! Xbox textures store uncompressed texels in Z-order: the bits of x and y
//! are interleaved (x in the lower bit) for as long as both axes still have
//! bits left, and the remaining bits of the longer axis follow.

/// Swizzled texel index of `(x, y)` in a `width` x `height` power-of-two image
pub fn swizzle_2d(x: u32, y: u32, width: u32, height: u32) -> u32 {
    let mut index = 0u32;
    let mut out_bit = 0u32;
    let mut bit = 0u32;
    while (1u32 << bit) < width || (1u32 << bit) < height {
        if (1u32 << bit) < width {
            index |= ((x >> bit) & 1) << out_bit;
            out_bit += 1;
        }
        if (1u32 << bit) < height {
            index |= ((y >> bit) & 1) << out_bit;
            out_bit += 1;
        }
        bit += 1;
    }
    index
}

/// Reorder `bytes_per_texel`-sized texels from Z-order into linear row order
pub fn unswizzle_2d(data: &[u8], width: u32, height: u32, bytes_per_texel: usize) -> Vec<u8> {
    let mut linear = vec![0u8; data.len()];
    for y in 0..height {
        for x in 0..width {
            let src = swizzle_2d(x, y, width, height) as usize * bytes_per_texel;
            let dst = (y * width + x) as usize * bytes_per_texel;
            if src + bytes_per_texel <= data.len() && dst + bytes_per_texel <= linear.len() {
                linear[dst..dst + bytes_per_texel].copy_from_slice(&data[src..src + bytes_per_texel]);
            }
        }
    }
    linear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_ordering() {
        // 4x4 interleaves x and y bits
        assert_eq!(swizzle_2d(0, 0, 4, 4), 0);
        assert_eq!(swizzle_2d(1, 0, 4, 4), 1);
        assert_eq!(swizzle_2d(0, 1, 4, 4), 2);
        assert_eq!(swizzle_2d(1, 1, 4, 4), 3);
        assert_eq!(swizzle_2d(2, 0, 4, 4), 4);
        assert_eq!(swizzle_2d(3, 3, 4, 4), 15);
    }

    #[test]
    fn test_wide_image_appends_remaining_x_bits() {
        // 8x2: one interleaved pair, then two extra x bits
        assert_eq!(swizzle_2d(0, 1, 8, 2), 2);
        assert_eq!(swizzle_2d(2, 0, 8, 2), 4);
        assert_eq!(swizzle_2d(4, 0, 8, 2), 8);
        assert_eq!(swizzle_2d(7, 1, 8, 2), 15);
    }

    #[test]
    fn test_indices_are_a_permutation() {
        let (w, h) = (16u32, 4u32);
        let mut seen = vec![false; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                let i = swizzle_2d(x, y, w, h) as usize;
                assert!(!seen[i], "duplicate index {} for ({}, {})", i, x, y);
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_unswizzle_2x2() {
        // Z-order 2x2 equals row order
        let data = [1u8, 2, 3, 4];
        assert_eq!(unswizzle_2d(&data, 2, 2, 1), vec![1, 2, 3, 4]);

        // 4x1 has no y bits, so also linear
        let row = [9u8, 8, 7, 6];
        assert_eq!(unswizzle_2d(&row, 4, 1, 1), vec![9, 8, 7, 6]);
    }
}
