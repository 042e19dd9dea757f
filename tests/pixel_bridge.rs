// Raster, frame and matrix conversions across every supported sample format.

#[cfg(test)]
mod pixel_bridge {
    use jpegexp_bridge::bridge::RasterKind;
    use jpegexp_bridge::codec::{FrameEncoder, RawCodec, TransferSyntax};
    use jpegexp_bridge::matrix::Sample;
    use jpegexp_bridge::{
        BitOrder, BridgeError, BridgeOptions, ChannelOrder, CodecParameterBuilder, ElementType,
        PixelBufferBridge, PixelDescriptor, PlanarConfiguration, Quality, Raster,
        RasterLayout, SampleData,
    };

    const WIDTH: usize = 5;
    const HEIGHT: usize = 3;

    fn bridges() -> [PixelBufferBridge; 2] {
        [ChannelOrder::Bgr, ChannelOrder::Rgb].map(|channel_order| {
            PixelBufferBridge::new(BridgeOptions {
                channel_order,
                ..BridgeOptions::default()
            })
        })
    }

    fn check_raster_round_trip<T: Sample>(signed: bool, value: impl Fn(usize) -> T) {
        for bridge in bridges() {
            for bands in [1, 3, 4] {
                let count = WIDTH * HEIGHT;
                let interleaved = Raster::new(
                    WIDTH,
                    HEIGHT,
                    signed,
                    RasterLayout::interleaved(WIDTH, bands),
                    T::wrap_banks(vec![(0..count * bands).map(&value).collect()]),
                )
                .unwrap();
                let banded = Raster::new(
                    WIDTH,
                    HEIGHT,
                    signed,
                    RasterLayout::banded(WIDTH, bands),
                    T::wrap_banks(
                        (0..bands)
                            .map(|b| (0..count).map(|i| value(b * count + i)).collect())
                            .collect(),
                    ),
                )
                .unwrap();

                for (raster, kind) in [
                    (&interleaved, RasterKind::Interleaved),
                    (&banded, RasterKind::Banded),
                ] {
                    let matrix = bridge.raster_to_matrix(raster).unwrap();
                    assert_eq!(matrix.rows(), HEIGHT);
                    assert_eq!(matrix.cols(), WIDTH);
                    assert_eq!(matrix.channels(), bands);
                    assert_eq!(matrix.element_type(), T::ELEMENT_TYPE);

                    let back = bridge.matrix_to_raster(&matrix, kind, signed).unwrap();
                    assert_eq!(&back, raster, "{kind:?} {bands} bands {:?}", bridge.options());
                }
            }
        }
    }

    #[test]
    fn test_raster_round_trip_u8() {
        check_raster_round_trip(false, |i| (i * 17 % 256) as u8);
    }

    #[test]
    fn test_raster_round_trip_signed_u8() {
        check_raster_round_trip(true, |i| (i as i8).wrapping_mul(-37) as u8);
    }

    #[test]
    fn test_raster_round_trip_u16() {
        check_raster_round_trip(false, |i| (i * 4099 % 65536) as u16);
    }

    #[test]
    fn test_raster_round_trip_s16() {
        check_raster_round_trip(true, |i| (i as i16 * 311).wrapping_sub(9000));
    }

    #[test]
    fn test_raster_round_trip_s32() {
        check_raster_round_trip(true, |i| i as i32 * -70_001);
    }

    #[test]
    fn test_raster_round_trip_unsigned_s32() {
        // unsigned 32-bit samples ride in S32 elements with their bits unchanged
        check_raster_round_trip(false, |i| (u32::MAX - i as u32 * 65_537) as i32);
    }

    #[test]
    fn test_raster_round_trip_f32() {
        check_raster_round_trip(true, |i| i as f32 * -0.25 + 1e-3);
    }

    #[test]
    fn test_raster_round_trip_f64() {
        check_raster_round_trip(true, |i| i as f64 / 3.0 - 7.5);
    }

    #[test]
    fn test_binary_raster_round_trip() {
        // 11 pixels per line, 3 bytes per line, first pixel at bit 5
        let layout = RasterLayout::PackedBinary {
            scanline_stride: 3,
            bit_offset: 5,
        };
        let packed: Vec<u8> = vec![0b1010_0110, 0b0111_0001, 0x00, 0b0000_0101, 0b1100_0011, 0xFF];
        let raster = Raster::new(11, 2, false, layout, SampleData::U8(vec![packed.clone()])).unwrap();

        let bridge = PixelBufferBridge::default();
        let matrix = bridge.raster_to_matrix(&raster).unwrap();
        let values = matrix.as_slice::<u8>().unwrap().unwrap();
        for y in 0..2 {
            for x in 0..11 {
                let bit = 5 + y * 24 + x;
                let expected = (packed[bit / 8] >> (7 - bit % 8)) & 1;
                assert_eq!(values[y * 11 + x], expected, "pixel ({x}, {y})");
                assert_eq!(raster.sample(x, y, 0), expected as f64);
            }
        }

        let back = bridge
            .matrix_to_raster(&matrix, RasterKind::PackedBinary, false)
            .unwrap();
        for y in 0..2 {
            for x in 0..11 {
                assert_eq!(back.sample(x, y, 0), raster.sample(x, y, 0));
            }
        }
    }

    #[test]
    fn test_binary_frame_is_lsb_first_continuous() {
        // 3x3 pixels, 9 bits over two bytes without line padding
        let desc = PixelDescriptor::new(3, 3, 1, 1);
        let frame = [0b1001_0110u8, 0b0000_0001];
        let matrix = PixelBufferBridge::default()
            .matrix_from_frame(&desc, &frame)
            .unwrap();
        assert_eq!(
            matrix.as_slice::<u8>().unwrap().unwrap(),
            &[0, 1, 1, 0, 1, 0, 0, 1, 1]
        );

        let msb = PixelBufferBridge::new(BridgeOptions {
            frame_bit_order: BitOrder::MsbFirst,
            ..BridgeOptions::default()
        });
        let matrix = msb.matrix_from_frame(&desc, &frame).unwrap();
        assert_eq!(
            matrix.as_slice::<u8>().unwrap().unwrap(),
            &[1, 0, 0, 1, 0, 1, 1, 0, 0]
        );
    }

    fn frame_bytes(desc: &PixelDescriptor) -> Vec<u8> {
        (0..desc.frame_length() as usize).map(|i| (i * 37 % 101) as u8).collect()
    }

    #[test]
    fn test_frame_round_trip_all_formats() {
        let formats = [
            (8, false, false),
            (8, true, false),
            (16, false, false),
            (16, true, false),
            (32, false, false),
            (32, true, false),
            (32, true, true),
            (64, true, true),
        ];
        for bridge in bridges() {
            for (bits, signed, float) in formats {
                for (samples, planar) in [
                    (1, PlanarConfiguration::Interleaved),
                    (3, PlanarConfiguration::Interleaved),
                    (3, PlanarConfiguration::Planar),
                ] {
                    let desc = PixelDescriptor::new(WIDTH as u32, HEIGHT as u32, bits, samples)
                        .with_signed(signed)
                        .with_floating_point(float)
                        .with_planar_configuration(planar);
                    let bytes = frame_bytes(&desc);

                    let matrix = bridge.matrix_from_frame(&desc, &bytes).unwrap();
                    assert_eq!(matrix.channels(), samples as usize);
                    assert_eq!(matrix.element_type(), desc.element_type().unwrap());
                    let back = bridge.frame_from_matrix(&desc, &matrix).unwrap();
                    assert_eq!(back, bytes, "{bits} bits, {samples} samples, {planar:?}");
                }
            }
        }
    }

    #[test]
    fn test_unsigned_32_bit_frame_keeps_high_values() {
        let desc = PixelDescriptor::new(3, 1, 32, 1);
        let values = [u32::MAX, 0x8000_0000, 7];
        let frame: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let bridge = PixelBufferBridge::default();
        let matrix = bridge.matrix_from_frame(&desc, &frame).unwrap();
        assert_eq!(matrix.element_type(), ElementType::S32);
        let samples = matrix.as_slice::<i32>().unwrap().unwrap();
        assert_eq!(
            samples.iter().map(|&s| s as u32).collect::<Vec<_>>(),
            values.to_vec()
        );
        assert_eq!(bridge.frame_from_matrix(&desc, &matrix).unwrap(), frame);
    }

    #[test]
    fn test_signed_8_bit_frame_keeps_bytes() {
        let desc = PixelDescriptor::new(4, 1, 8, 1).with_signed(true);
        let frame = [0x80u8, 0xFF, 0x00, 0x7F];

        let bridge = PixelBufferBridge::default();
        let matrix = bridge.matrix_from_frame(&desc, &frame).unwrap();
        assert_eq!(matrix.element_type(), ElementType::U8);
        assert_eq!(matrix.as_slice::<u8>().unwrap().unwrap(), &frame);
        assert_eq!(bridge.frame_from_matrix(&desc, &matrix).unwrap(), frame.to_vec());
    }

    #[test]
    fn test_planar_rgb_frame_merges_in_channel_order() {
        let desc = PixelDescriptor::new(2, 1, 8, 3)
            .with_planar_configuration(PlanarConfiguration::Planar);
        let frame = [1u8, 2, 10, 20, 100, 200];

        let bgr = PixelBufferBridge::default().matrix_from_frame(&desc, &frame).unwrap();
        assert_eq!(bgr.as_slice::<u8>().unwrap().unwrap(), &[100, 10, 1, 200, 20, 2]);

        let [_, rgb_bridge] = bridges();
        let rgb = rgb_bridge.matrix_from_frame(&desc, &frame).unwrap();
        assert_eq!(rgb.as_slice::<u8>().unwrap().unwrap(), &[1, 10, 100, 2, 20, 200]);
    }

    #[test]
    fn test_unsupported_sample_format() {
        let desc = PixelDescriptor::new(4, 4, 24, 1);
        let err = PixelBufferBridge::default()
            .matrix_from_frame(&desc, &[0u8; 48])
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnsupportedSampleFormat {
                bits_allocated: 24,
                ..
            }
        ));
    }

    #[test]
    fn test_signed_near_lossless_encodes_lossless() {
        let desc = PixelDescriptor::new(16, 16, 16, 1).with_signed(true);
        let params = TransferSyntax::JpegLsNearLossless
            .parameter_builder()
            .build(&desc, ElementType::S16)
            .unwrap();
        assert_eq!(params.quality(), Quality::Lossless);
        assert_eq!(params.near_lossless(), 0);
    }

    #[test]
    fn test_raw_encode_of_rgb_raster_matches_frame_layout() {
        let raster = Raster::new(
            2,
            1,
            false,
            RasterLayout::banded(2, 3),
            SampleData::U8(vec![vec![1, 2], vec![10, 20], vec![100, 200]]),
        )
        .unwrap();
        let desc = PixelDescriptor::new(2, 1, 8, 3);
        let encoder = FrameEncoder::new(
            RawCodec::default(),
            CodecParameterBuilder::default(),
            BridgeOptions::default(),
        );

        let mut sink = Vec::new();
        encoder.encode_raster(&raster, &desc, &mut sink).unwrap();
        assert_eq!(sink, vec![1, 10, 100, 2, 20, 200]);

        let planar = desc.with_planar_configuration(PlanarConfiguration::Planar);
        let mut sink = Vec::new();
        encoder.encode_raster(&raster, &planar, &mut sink).unwrap();
        assert_eq!(sink, vec![1, 2, 10, 20, 100, 200]);
    }
}
