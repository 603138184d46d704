//! Body-centred-cubic rest positions
//!
//! The lattice is the only source of particle home positions and defines the
//! ordered geometry the spring force pulls toward.

/// Edge length of the full lattice cube in world units, independent of N
pub const LATTICE_EXTENT: f32 = 5.0;

/// Number of cells per side needed to hold `count` atoms at two per cell
pub fn cells_per_side(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let cells = count.div_ceil(2) as f64;
    let mut side = cells.cbrt().ceil() as usize;
    // Guard against cbrt rounding just below an exact cube
    while side * side * side * 2 < count {
        side += 1;
    }
    side
}

/// Generate `count` BCC home positions centred on the origin.
///
/// Cells are visited nearest-first from the lattice centre, so a partial
/// lattice is a compact ball rather than a clipped cube. Each corner atom is
/// paired with the body-centre atom at its point reflection through the
/// centre, which keeps every even-sized lattice exactly symmetric about the
/// origin.
pub fn bcc_lattice(count: usize) -> Vec<[f32; 3]> {
    let side = cells_per_side(count);
    if side == 0 {
        return Vec::new();
    }

    let spacing = LATTICE_EXTENT / side as f32;
    // Corners span [0, side-1], body centres [0.5, side-0.5]; the union is
    // symmetric about (side - 0.5) / 2.
    let centre = (side as f32 - 0.5) * 0.5;
    let mid = (side as f32 - 1.0) * 0.5;

    let mut cells: Vec<[usize; 3]> = Vec::with_capacity(side * side * side);
    for z in 0..side {
        for y in 0..side {
            for x in 0..side {
                cells.push([x, y, z]);
            }
        }
    }

    let key = |c: &[usize; 3]| -> (u64, usize) {
        let d2: f32 = c.iter().map(|&i| (i as f32 - mid).powi(2)).sum();
        // d2 is a multiple of 0.25, so this is an exact ordering key
        let rank = (d2 * 4.0).round() as u64;
        (rank, c[0] + side * (c[1] + side * c[2]))
    };
    cells.sort_by_key(key);

    let to_world = |g: [f32; 3]| -> [f32; 3] {
        [
            (g[0] - centre) * spacing,
            (g[1] - centre) * spacing,
            (g[2] - centre) * spacing,
        ]
    };

    let mut positions = Vec::with_capacity(count);
    for cell in cells {
        if positions.len() >= count {
            break;
        }
        let corner = [cell[0] as f32, cell[1] as f32, cell[2] as f32];
        positions.push(to_world(corner));

        if positions.len() >= count {
            break;
        }
        // Body centre of the mirrored cell: the exact reflection of this corner
        let mirrored = [
            (side - 1 - cell[0]) as f32 + 0.5,
            (side - 1 - cell[1]) as f32 + 0.5,
            (side - 1 - cell[2]) as f32 + 0.5,
        ];
        positions.push(to_world(mirrored));
    }

    positions
}
