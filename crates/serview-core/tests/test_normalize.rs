mod common;

use common::{u16_samples, SerBuilder};
use serview_core::color::{
    CfaRemapRule, CfaRemapTable, DemosaicChoice, DemosaicStrategy, Normalizer,
};
use serview_core::frame::ColorFormat;
use serview_core::io::ser::{Endianness, SerReader};
use serview_core::SessionConfig;

fn decode(builder: &SerBuilder, strategy: DemosaicStrategy, index: usize) -> ndarray::Array3<u8> {
    let reader = SerReader::from_bytes(builder.build()).unwrap();
    let normalizer = Normalizer::new(strategy, CfaRemapTable::default());
    normalizer
        .normalize(reader.frame_raw(index).unwrap(), &reader.metadata)
        .unwrap()
        .pixels
}

/// 2x2 CYYM cell for R=80, G=70, B=30: Cy=100, Ye=150, Mg=110.
fn cyym_cell() -> Vec<u8> {
    vec![100, 150, 150, 110]
}

// ---------------------------------------------------------------------------
// Depth
// ---------------------------------------------------------------------------

#[test]
fn test_mono8_replicated() {
    let builder = SerBuilder::mono8(3, 2).frame(vec![0, 1, 2, 253, 254, 255]);
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    assert_eq!(px.dim(), (2, 3, 3));
    assert_eq!(px[[1, 2, 0]], 255);
    for row in 0..2 {
        for col in 0..3 {
            let v = px[[row, col, 0]];
            assert_eq!(px[[row, col, 1]], v);
            assert_eq!(px[[row, col, 2]], v);
        }
    }
    assert_eq!(px[[1, 0, 0]], 253);
}

#[test]
fn test_16bit_within_one_of_shift() {
    for endianness in [Endianness::Little, Endianness::Big] {
        let values: Vec<u16> = (0..256u32).map(|i| (i * 257) as u16).collect();
        let builder = SerBuilder::new(ColorFormat::Mono, 16, 16, 16)
            .endianness(endianness)
            .frame(u16_samples(&values, endianness));
        let px = decode(&builder, DemosaicStrategy::default(), 0);
        for (i, &v) in values.iter().enumerate() {
            let got = px[[i / 16, i % 16, 0]] as i32;
            let want = (v >> 8) as i32;
            assert!((got - want).abs() <= 1, "{v}: got {got}, want {want}");
            // Values that came from 8-bit data survive exactly.
            assert_eq!(got, i as i32);
        }
    }
}

#[test]
fn test_16bit_endianness_matters() {
    let le = SerBuilder::new(ColorFormat::Mono, 1, 1, 16).frame(vec![0x00, 0xFF]);
    let be = SerBuilder::new(ColorFormat::Mono, 1, 1, 16)
        .endianness(Endianness::Big)
        .frame(vec![0x00, 0xFF]);
    assert_eq!(decode(&le, DemosaicStrategy::default(), 0)[[0, 0, 0]], 254);
    assert_eq!(decode(&be, DemosaicStrategy::default(), 0)[[0, 0, 0]], 1);
}

#[test]
fn test_12bit_scaled_to_full_range() {
    let values = [0u16, 4095, 2048, 5000];
    let builder = SerBuilder::new(ColorFormat::Mono, 4, 1, 12)
        .frame(u16_samples(&values, Endianness::Little));
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    assert_eq!(px[[0, 0, 0]], 0);
    assert_eq!(px[[0, 1, 0]], 255);
    assert_eq!(px[[0, 2, 0]], 128);
    // Out-of-range samples clamp.
    assert_eq!(px[[0, 3, 0]], 255);
}

// ---------------------------------------------------------------------------
// Planar color
// ---------------------------------------------------------------------------

#[test]
fn test_rgb_passthrough() {
    let builder = SerBuilder::new(ColorFormat::RGB, 2, 1, 8).frame(vec![1, 2, 3, 4, 5, 6]);
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    assert_eq!(px.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_bgr_swapped() {
    let builder = SerBuilder::new(ColorFormat::BGR, 2, 1, 8).frame(vec![1, 2, 3, 4, 5, 6]);
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    assert_eq!(px.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1, 6, 5, 4]);
}

#[test]
fn test_rgb_16bit() {
    let values = [65535u16, 0, 257];
    let builder = SerBuilder::new(ColorFormat::RGB, 1, 1, 16)
        .frame(u16_samples(&values, Endianness::Little));
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    assert_eq!(px.iter().copied().collect::<Vec<_>>(), vec![255, 0, 1]);
}

// ---------------------------------------------------------------------------
// Bayer
// ---------------------------------------------------------------------------

/// RGGB mosaic with constant R=200, G=100, B=50.
fn rggb_flat(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size * size];
    for row in 0..size {
        for col in 0..size {
            data[row * size + col] = match (row % 2, col % 2) {
                (0, 0) => 200,
                (1, 1) => 50,
                _ => 100,
            };
        }
    }
    data
}

#[test]
fn test_bayer_bilinear_interior() {
    let builder = SerBuilder::new(ColorFormat::BayerRGGB, 8, 8, 8).frame(rggb_flat(8));
    let px = decode(&builder, DemosaicStrategy::resolve(DemosaicChoice::Bilinear), 0);
    for row in 2..6 {
        for col in 2..6 {
            assert_eq!(
                [px[[row, col, 0]], px[[row, col, 1]], px[[row, col, 2]]],
                [200, 100, 50],
                "pixel ({row}, {col})"
            );
        }
    }
}

#[test]
fn test_bayer_malvar_interior() {
    let builder = SerBuilder::new(ColorFormat::BayerRGGB, 8, 8, 8).frame(rggb_flat(8));
    let px = decode(
        &builder,
        DemosaicStrategy::resolve(DemosaicChoice::MalvarHeCutler),
        0,
    );
    for row in 2..6 {
        for col in 2..6 {
            assert_eq!(
                [px[[row, col, 0]], px[[row, col, 1]], px[[row, col, 2]]],
                [200, 100, 50],
                "pixel ({row}, {col})"
            );
        }
    }
}

#[test]
fn test_bayer_pattern_shift() {
    // The same bytes read as BGGR swap red and blue.
    let builder = SerBuilder::new(ColorFormat::BayerBGGR, 8, 8, 8).frame(rggb_flat(8));
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    assert_eq!([px[[3, 3, 0]], px[[3, 3, 1]], px[[3, 3, 2]]], [50, 100, 200]);
}

#[test]
fn test_grayscale_fallback_keeps_mosaic() {
    let builder = SerBuilder::new(ColorFormat::BayerRGGB, 8, 8, 8).frame(rggb_flat(8));
    let px = decode(&builder, DemosaicStrategy::GrayscaleFallback, 0);
    assert_eq!(px.dim(), (8, 8, 3));
    assert_eq!([px[[0, 0, 0]], px[[0, 0, 1]], px[[0, 0, 2]]], [200, 200, 200]);
    assert_eq!([px[[1, 1, 0]], px[[1, 1, 1]], px[[1, 1, 2]]], [50, 50, 50]);
}

// ---------------------------------------------------------------------------
// Complementary mosaics
// ---------------------------------------------------------------------------

#[test]
fn test_cyym_solves_primaries() {
    let builder = SerBuilder::new(ColorFormat::BayerCYYM, 2, 2, 8).frame(cyym_cell());
    let px = decode(&builder, DemosaicStrategy::default(), 0);
    for row in 0..2 {
        for col in 0..2 {
            assert_eq!(
                [px[[row, col, 0]], px[[row, col, 1]], px[[row, col, 2]]],
                [80, 70, 30]
            );
        }
    }
}

#[test]
fn test_cyym_grayscale_fallback() {
    let builder = SerBuilder::new(ColorFormat::BayerCYYM, 2, 2, 8).frame(cyym_cell());
    let px = decode(&builder, DemosaicStrategy::GrayscaleFallback, 0);
    assert_eq!(px[[0, 0, 0]], 100);
    assert_eq!(px[[1, 1, 2]], 110);
}

#[test]
fn test_remap_by_instrument_substring() {
    let builder = SerBuilder::new(ColorFormat::BayerCYYM, 2, 2, 8)
        .instrument("zwo asi294mc pro")
        .frame(cyym_cell());
    let reader = SerReader::from_bytes(builder.build()).unwrap();
    let normalizer = Normalizer::default();
    assert_eq!(normalizer.effective_format(&reader.metadata), ColorFormat::BayerYCMY);

    let remapped = decode(&builder, DemosaicStrategy::default(), 0);
    assert_ne!(
        [remapped[[0, 0, 0]], remapped[[0, 0, 1]], remapped[[0, 0, 2]]],
        [80, 70, 30]
    );
}

#[test]
fn test_remap_by_lu_id() {
    let table = CfaRemapTable::new(vec![CfaRemapRule {
        lu_id: Some(42),
        instrument: None,
        pattern: ColorFormat::BayerMYYC,
    }]);
    let normalizer = Normalizer::new(DemosaicStrategy::default(), table);

    let matching = SerBuilder::new(ColorFormat::BayerCYYM, 2, 2, 8)
        .lu_id(42)
        .frame(cyym_cell())
        .build();
    let other = SerBuilder::new(ColorFormat::BayerCYYM, 2, 2, 8)
        .lu_id(41)
        .frame(cyym_cell())
        .build();

    let meta = SerReader::from_bytes(matching).unwrap().metadata;
    assert_eq!(normalizer.effective_format(&meta), ColorFormat::BayerMYYC);
    let meta = SerReader::from_bytes(other).unwrap().metadata;
    assert_eq!(normalizer.effective_format(&meta), ColorFormat::BayerCYYM);
}

#[test]
fn test_remap_ignores_primary_mosaics() {
    let builder = SerBuilder::new(ColorFormat::BayerRGGB, 2, 2, 8)
        .instrument("ZWO ASI183MC")
        .frame(vec![0; 4]);
    let meta = SerReader::from_bytes(builder.build()).unwrap().metadata;
    assert_eq!(Normalizer::default().effective_format(&meta), ColorFormat::BayerRGGB);
}

#[test]
fn test_empty_remap_table_keeps_declared() {
    let config = SessionConfig {
        cfa_remap: CfaRemapTable::empty(),
        ..SessionConfig::default()
    };
    let session = SerBuilder::new(ColorFormat::BayerCYYM, 2, 2, 8)
        .instrument("ZWO ASI183MC")
        .frame(cyym_cell())
        .session_with(&config);
    assert_eq!(session.effective_format(), ColorFormat::BayerCYYM);
    let frame = session.decode_frame(0).unwrap();
    assert_eq!(frame.rgb(1, 1), [80, 70, 30]);
}
