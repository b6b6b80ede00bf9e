//! AuditKeeper application icon generator.
//!
//! Produces a procedural icon: a ledger sheet with ruled lines, a folded
//! corner, and a round check badge in the lower right. Rendered at any
//! resolution as RGBA pixel data for the window icon.

/// Generate the AuditKeeper icon as egui `IconData`.
pub fn generate_icon(size: u32) -> egui::IconData {
    egui::IconData {
        rgba: render_icon(size),
        width: size,
        height: size,
    }
}

/// Render the icon into an RGBA pixel buffer (top-to-bottom row order).
pub fn render_icon(size: u32) -> Vec<u8> {
    let s = size as f32;
    let mut pixels = vec![0u8; (size * size * 4) as usize];

    // ── Layout ──────────────────────────────────────────────────
    let sheet_left = s * 0.14;
    let sheet_right = s * 0.76;
    let sheet_top = s * 0.08;
    let sheet_bottom = s * 0.90;
    let corner = s * 0.16;
    let radius = s * 0.04;

    let line_left = sheet_left + s * 0.10;
    let line_right = sheet_right - s * 0.10;
    let line_half = (s * 0.018).max(0.6);
    let rows = [0.34, 0.46, 0.58, 0.70];

    let badge_cx = s * 0.72;
    let badge_cy = s * 0.74;
    let badge_r = s * 0.22;
    let check_width = s * 0.035;
    let check = [
        (badge_cx - badge_r * 0.45, badge_cy + badge_r * 0.02),
        (badge_cx - badge_r * 0.10, badge_cy + badge_r * 0.38),
        (badge_cx + badge_r * 0.48, badge_cy - badge_r * 0.32),
    ];

    let paper = [0xe4, 0xe4, 0xe8];
    let fold = [0xb8, 0xb8, 0xc4];
    let rule = [0x89, 0xb4, 0xfa];
    let badge = [0xa6, 0xe3, 0xa1];
    let ink = [0x1e, 0x1e, 0x2e];

    // ── Per-pixel rendering ─────────────────────────────────────
    for y in 0..size {
        for x in 0..size {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            let mut col = [0u8; 3];
            let mut alpha = 0.0f32;

            // 1. Sheet with the top-right corner cut off. ────────
            let sheet = rounded_rect(
                px,
                py,
                (sheet_left, sheet_top),
                (sheet_right, sheet_bottom),
                radius,
            );
            let cut = smooth_edge((px - (sheet_right - corner)) - (py - sheet_top), 0.0);
            let sheet_alpha = sheet * cut;
            if sheet_alpha > 0.0 {
                // Slight vertical shading.
                let shade = 1.0 - 0.10 * ((py - sheet_top) / (sheet_bottom - sheet_top));
                let shaded = paper.map(|c| (c as f32 * shade) as u8);
                col = blend(col, shaded, sheet_alpha);
                alpha = sheet_alpha;
            }

            // 2. Folded-over flap below the cut. ──────────────────
            let in_fold = px <= sheet_right
                && py >= sheet_top
                && px >= sheet_right - corner
                && py <= sheet_top + corner;
            if in_fold {
                let d = (px - (sheet_right - corner)) - (py - sheet_top);
                let fold_alpha = smooth_edge(d, 0.0);
                col = blend(col, fold, fold_alpha);
                alpha = alpha + (1.0 - alpha) * fold_alpha;
            }

            // 3. Ruled lines. ────────────────────────────────────
            if sheet_alpha > 0.5 && px >= line_left && px <= line_right {
                for row in rows {
                    let ly = s * row;
                    let line_alpha = smooth_edge((py - ly).abs(), line_half);
                    if line_alpha > 0.0 {
                        col = blend(col, rule, line_alpha * 0.9);
                    }
                }
            }

            // 4. Check badge. ────────────────────────────────────
            let dx = px - badge_cx;
            let dy = py - badge_cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < badge_r + 1.5 {
                let badge_alpha = smooth_edge(dist, badge_r);
                let shade = 1.0 - 0.15 * (dist / badge_r).min(1.0);
                let shaded = badge.map(|c| (c as f32 * shade) as u8);
                col = blend(col, shaded, badge_alpha);
                alpha = alpha + (1.0 - alpha) * badge_alpha;

                let d = point_to_seg_dist(px, py, check[0], check[1])
                    .min(point_to_seg_dist(px, py, check[1], check[2]));
                let check_alpha = smooth_edge(d, check_width) * badge_alpha;
                col = blend(col, ink, check_alpha);
            }

            let idx = ((y * size + x) * 4) as usize;
            pixels[idx..idx + 3].copy_from_slice(&col);
            pixels[idx + 3] = (alpha * 255.0).clamp(0.0, 255.0) as u8;
        }
    }

    pixels
}

// ── Helpers ─────────────────────────────────────────────────────

/// Smooth anti-aliased edge (1 → 0 as `dist` crosses `edge`).
fn smooth_edge(dist: f32, edge: f32) -> f32 {
    let d = dist - edge;
    if d < -1.0 {
        1.0
    } else if d > 1.0 {
        0.0
    } else {
        0.5 - d * 0.5
    }
}

/// Coverage of a rounded rectangle at a pixel centre.
fn rounded_rect(px: f32, py: f32, min: (f32, f32), max: (f32, f32), r: f32) -> f32 {
    let (left, top) = min;
    let (right, bottom) = max;
    let qx = (left + r - px).max(px - (right - r)).max(0.0);
    let qy = (top + r - py).max(py - (bottom - r)).max(0.0);
    let outside = (qx * qx + qy * qy).sqrt();
    let inside = (left - px).max(px - right).max(top - py).max(py - bottom);
    let d = if outside > 0.0 { outside - r } else { inside };
    smooth_edge(d, 0.0)
}

/// Distance from a point to a line segment.
fn point_to_seg_dist(px: f32, py: f32, a: (f32, f32), b: (f32, f32)) -> f32 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let len_sq = abx * abx + aby * aby;
    if len_sq < 0.0001 {
        return ((px - a.0).powi(2) + (py - a.1).powi(2)).sqrt();
    }
    let t = (((px - a.0) * abx + (py - a.1) * aby) / len_sq).clamp(0.0, 1.0);
    ((px - (a.0 + t * abx)).powi(2) + (py - (a.1 + t * aby)).powi(2)).sqrt()
}

fn blend(under: [u8; 3], over: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [0, 1, 2].map(|i| (under[i] as f32 * (1.0 - t) + over[i] as f32 * t) as u8)
}
