//! Triangle index rearrangement and delta coding.
//!
//! Shared by the MG1 and MG2 codecs. The canonical triangle order plus
//! the delta transform turn the index array into mostly-small values
//! that the entropy coder compresses well.

/// Rotate and sort triangles into the canonical compression order.
///
/// Each triangle is cyclically rotated (never reflected, so winding is
/// preserved) to put its smallest index first; rotation happens only
/// when the second or third index is the strict minimum of the triple.
/// Triangles are then sorted by (first, second, third) index. Applying
/// the function twice yields the same result as applying it once.
///
/// `indices` must hold a whole number of triangles.
pub fn rearrange_triangles(indices: &mut [u32]) {
    debug_assert!(indices.len() % 3 == 0);

    for tri in indices.chunks_exact_mut(3) {
        if tri[1] < tri[0] && tri[1] < tri[2] {
            let tmp = tri[0];
            tri[0] = tri[1];
            tri[1] = tri[2];
            tri[2] = tmp;
        } else if tri[2] < tri[0] && tri[2] < tri[1] {
            let tmp = tri[0];
            tri[0] = tri[2];
            tri[2] = tri[1];
            tri[1] = tmp;
        }
    }

    let mut triangles: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect();
    triangles.sort_unstable();
    for (tri, sorted) in indices.chunks_exact_mut(3).zip(&triangles) {
        tri.copy_from_slice(sorted);
    }
}

/// Delta-code a canonically ordered index array in place.
///
/// Runs back-to-front so every delta is taken against the still-original
/// values of the preceding triangle:
/// 1. third index against the triangle's own first index,
/// 2. second index against the previous triangle's second index when
///    both share the same first index, else against the own first index,
/// 3. first index against the previous triangle's first index.
pub fn make_index_deltas(indices: &mut [i32]) {
    debug_assert!(indices.len() % 3 == 0);

    for i in (0..indices.len() / 3).rev() {
        if i >= 1 && indices[i * 3] == indices[(i - 1) * 3] {
            indices[i * 3 + 1] -= indices[(i - 1) * 3 + 1];
        } else {
            indices[i * 3 + 1] -= indices[i * 3];
        }

        indices[i * 3 + 2] -= indices[i * 3];

        if i >= 1 {
            indices[i * 3] -= indices[(i - 1) * 3];
        }
    }
}

/// Reverse [`make_index_deltas`] in place, front-to-back.
pub fn restore_indices(indices: &mut [i32]) {
    debug_assert!(indices.len() % 3 == 0);

    for i in 0..indices.len() / 3 {
        if i >= 1 {
            indices[i * 3] += indices[(i - 1) * 3];
        }

        indices[i * 3 + 2] += indices[i * 3];

        if i >= 1 && indices[i * 3] == indices[(i - 1) * 3] {
            indices[i * 3 + 1] += indices[(i - 1) * 3 + 1];
        } else {
            indices[i * 3 + 1] += indices[i * 3];
        }
    }
}
