use std::path::Path;

use image::{Rgb, RgbImage};
use lloyd::{Snapshot, Vec2};

const IMAGE_WIDTH: u32 = 800;

/// Ten-colour categorical palette; cluster `i` uses `PALETTE[i % 10]`.
const PALETTE: [[u8; 3]; 10] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];
const UNASSIGNED: [u8; 3] = [0xb0, 0xb0, 0xb0];
const BACKGROUND: [u8; 3] = [0xff, 0xff, 0xff];
const OUTLINE: [u8; 3] = [0x00, 0x00, 0x00];

pub fn cluster_color(cluster: Option<usize>) -> Rgb<u8> {
    Rgb(cluster.map_or(UNASSIGNED, |c| PALETTE[c % PALETTE.len()]))
}

/// Draw one snapshot: points as small dots coloured by cluster, centroids as
/// outlined squares.
pub fn save_frame(snapshot: &Snapshot, canvas: (f64, f64), path: &Path) -> anyhow::Result<()> {
    let (canvas_width, canvas_height) = canvas;
    let scale = IMAGE_WIDTH as f64 / canvas_width;
    let image_height = ((canvas_height * scale).ceil() as u32).max(1);
    let mut imgbuf = RgbImage::from_pixel(IMAGE_WIDTH, image_height, Rgb(BACKGROUND));

    let to_pixel = |v: Vec2| -> (i64, i64) {
        (
            (v.x * scale).round() as i64,
            (v.y * scale).round() as i64,
        )
    };

    for point in &snapshot.points {
        let (x, y) = to_pixel(point.position());
        fill_square(&mut imgbuf, x, y, 1, cluster_color(point.cluster));
    }

    for (index, centroid) in snapshot.centroids.iter().enumerate() {
        let (x, y) = to_pixel(*centroid);
        fill_square(&mut imgbuf, x, y, 6, Rgb(OUTLINE));
        fill_square(&mut imgbuf, x, y, 4, cluster_color(Some(index)));
    }

    imgbuf.save(path)?;
    Ok(())
}

fn fill_square(imgbuf: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    let (width, height) = (imgbuf.width() as i64, imgbuf.height() as i64);
    for y in (cy - radius).max(0)..=(cy + radius).min(height - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(width - 1) {
            imgbuf.put_pixel(x as u32, y as u32, color);
        }
    }
}
