extern crate criterion;
extern crate tiff_baseline;

use std::io::Write;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use tiff_baseline::decoder::decode;

const WIDTH: u32 = 512;
const HEIGHT: u32 = 512;
const ROWS_PER_STRIP: u32 = 64;

/// A little endian RGB image whose strips are compressed with `compress`.
fn rgb_image(compression: u16, compress: impl Fn(&[u8]) -> Vec<u8>) -> Vec<u8> {
    let stride = (WIDTH * 3) as usize;
    let pixels: Vec<u8> = (0..stride * HEIGHT as usize)
        .map(|i| ((i % stride) / 3 + (i / stride) / 2) as u8)
        .collect();
    let strips: Vec<Vec<u8>> = pixels
        .chunks(stride * ROWS_PER_STRIP as usize)
        .map(|strip| compress(strip))
        .collect();

    let mut file = b"II*\0".to_vec();
    let data_len: usize = strips.iter().map(Vec::len).sum();
    let tables = 8 + data_len;
    let ifd = tables + 8 * strips.len() + 6;
    file.extend_from_slice(&(ifd as u32).to_le_bytes());

    let mut offsets = Vec::new();
    for strip in &strips {
        offsets.push(file.len() as u32);
        file.extend_from_slice(strip);
    }
    for offset in &offsets {
        file.extend_from_slice(&offset.to_le_bytes());
    }
    for strip in &strips {
        file.extend_from_slice(&(strip.len() as u32).to_le_bytes());
    }
    // Bits per sample.
    file.extend_from_slice(&[8, 0, 8, 0, 8, 0]);
    assert_eq!(file.len(), ifd);

    let count = strips.len() as u32;
    let entries: [(u16, u16, u32, u32); 9] = [
        (256, 4, 1, WIDTH),
        (257, 4, 1, HEIGHT),
        (258, 3, 3, (tables + 8 * strips.len()) as u32),
        (259, 3, 1, u32::from(compression)),
        (262, 3, 1, 2),
        (273, 4, count, tables as u32),
        (277, 3, 1, 3),
        (278, 4, 1, ROWS_PER_STRIP),
        (279, 4, count, (tables + 4 * strips.len()) as u32),
    ];
    file.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, type_, count, value) in entries {
        file.extend_from_slice(&tag.to_le_bytes());
        file.extend_from_slice(&type_.to_le_bytes());
        file.extend_from_slice(&count.to_le_bytes());
        file.extend_from_slice(&value.to_le_bytes());
    }
    file.extend_from_slice(&[0; 4]);
    file
}

fn main() {
    let lzw = rgb_image(5, |data| {
        weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            .encode(data)
            .unwrap()
    });
    let deflate = rgb_image(8, |data| {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    });
    let uncompressed = rgb_image(1, <[u8]>::to_vec);

    let mut c = Criterion::default().configure_from_args();
    let mut group = c.benchmark_group("tiff-decode");

    for (id, data) in [
        ("uncompressed", &uncompressed),
        ("lzw", &lzw),
        ("deflate", &deflate),
    ] {
        group
            .sample_size(50)
            .throughput(Throughput::Bytes(u64::from(WIDTH * HEIGHT * 3)))
            .bench_with_input(BenchmarkId::new(id, data.len()), data, |b, input| {
                b.iter(|| decode(black_box(input)).unwrap())
            });
    }

    group.finish();
    c.final_summary();
}
