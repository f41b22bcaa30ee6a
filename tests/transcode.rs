use ndarray::{Array1, ArrayD, IxDyn};
use terra_repack::container::{AttrValue, MemoryDestination, MemorySource, Target};
use terra_repack::decode::tables::{aster, misr, modis};
use terra_repack::decode::{GeometryScaleUnpack, LinearUnpack};
use terra_repack::engine::{Context, WriteOptions, PURE_DIMENSION_LABEL};
use terra_repack::time::{CalendarConverter, OrbitWindow, SubsettingBounds, LEAP_SECONDS};
use terra_repack::transcode::{
    convert_time_dataset, copy_attributes, copy_dataset, copy_dataset_subset, copy_dimensions,
    create_group, detect_decoder, set_string_attribute, unpack_dataset, window_bounds, Decoder,
    DimensionOptions, TIME_UNITS,
};
use terra_repack::types::Buffer;
use terra_repack::RepackError;

fn context() -> Context<MemoryDestination> {
    Context::create(MemoryDestination::new(), WriteOptions::default()).unwrap()
}

fn f64s(values: Vec<f64>) -> Buffer {
    Buffer::from_array(Array1::from(values).into_dyn())
}

#[test]
fn test_large_float_copy_is_byte_identical() {
    let shape = [13091, 660];
    let values: Vec<f32> = (0..shape[0] * shape[1]).map(|i| (i % 9973) as f32 * 0.37).collect();
    let data = Buffer::from_shape_vec(&shape, values).unwrap();
    let mut source = MemorySource::new();
    source
        .insert("/Data Fields/Radiance", data.clone())
        .with_dimension(0, "nTrack", None)
        .with_dimension(1, "nXtrack", None);

    let mut ctx = context();
    let path = "/Data Fields/Radiance";
    let handle = copy_dataset(&mut ctx, &source, path, "/").unwrap();
    copy_dimensions(&mut ctx, &source, path, &handle, &DimensionOptions::default()).unwrap();
    let dest = ctx.close().unwrap();

    let written = dest.dataset("/Radiance").unwrap();
    assert_eq!(written.data.to_le_bytes(), data.to_le_bytes());
    assert_eq!(
        dest.dimension_names("/Radiance"),
        vec![Some("nTrack".to_string()), Some("nXtrack".to_string())]
    );
    let scale = dest.dataset("/nTrack").unwrap();
    assert_eq!(scale.attributes.get("NAME"), Some(&AttrValue::from(PURE_DIMENSION_LABEL)));
}

#[test]
fn test_datasets_share_one_dimension_per_name() {
    let mut source = MemorySource::new();
    let track = f64s(vec![0.5, 1.5, 2.5]);
    for name in ["Latitude", "Longitude"] {
        source
            .insert(
                &format!("/Geo/{}", name),
                Buffer::from_shape_vec(&[3, 2], vec![0f32; 6]).unwrap(),
            )
            .with_dimension(0, "nTrack", Some(track.clone()))
            .with_dimension(1, "nXtrack", None);
    }

    let mut ctx = context();
    for name in ["Latitude", "Longitude"] {
        let path = format!("/Geo/{}", name);
        let handle = copy_dataset(&mut ctx, &source, &path, "/").unwrap();
        copy_dimensions(&mut ctx, &source, &path, &handle, &DimensionOptions::default()).unwrap();
    }
    assert_eq!(ctx.registry().len(), 2);
    let dest = ctx.close().unwrap();

    assert_eq!(dest.object_count(), 4);
    let scale = dest.dataset("/nTrack").unwrap();
    assert_eq!(scale.data, track);
    assert_eq!(scale.references.len(), 2);
    assert_eq!(scale.attributes.get("NAME"), Some(&AttrValue::from("nTrack")));
}

#[test]
fn test_subset_copy_slices_data_and_scale() {
    let mut source = MemorySource::new();
    source
        .insert("/Time", f64s(vec![10.0, 20.0, 20.0, 30.0, 40.0]))
        .with_dimension(0, "nTime", None);
    source
        .insert(
            "/Counts",
            Buffer::from_shape_vec(&[5, 2], (0..10).collect::<Vec<i32>>()).unwrap(),
        )
        .with_dimension(0, "nTime", Some(f64s(vec![0.0, 1.0, 2.0, 3.0, 4.0])))
        .with_dimension(1, "nPixel", None);

    let bounds = SubsettingBounds::Rows { start: 1, end: 2 };
    let mut ctx = context();
    let handle = copy_dataset_subset(&mut ctx, &source, "/Counts", "/", bounds)
        .unwrap()
        .unwrap();
    let options = DimensionOptions {
        suffix: Some("_subset".to_string()),
        subset: Some(bounds),
        band_tables: false,
    };
    copy_dimensions(&mut ctx, &source, "/Counts", &handle, &options).unwrap();
    let dest = ctx.close().unwrap();

    assert_eq!(
        dest.dataset("/Counts").unwrap().data.to_f64_vec(),
        vec![2.0, 3.0, 4.0, 5.0]
    );
    assert_eq!(
        dest.dataset("/nTime_subset").unwrap().data.to_f64_vec(),
        vec![1.0, 2.0]
    );
    assert!(dest.dataset("/nPixel_subset").is_some());
}

#[test]
fn test_no_overlap_writes_nothing() {
    let mut source = MemorySource::new();
    source.insert("/Counts", Buffer::from_shape_vec(&[2], vec![1u8, 2]).unwrap());
    let mut ctx = context();
    let written =
        copy_dataset_subset(&mut ctx, &source, "/Counts", "/", SubsettingBounds::NoOverlap)
            .unwrap();
    assert!(written.is_none());
    assert_eq!(ctx.destination().object_count(), 0);
}

#[test]
fn test_orbit_window_selects_rows() {
    let conv = CalendarConverter::new(&LEAP_SECONDS);
    let start = chrono::NaiveDate::from_ymd_opt(2010, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let end = start + chrono::Duration::minutes(10);
    let window = OrbitWindow::new(start, end);
    let (t0, _) = window.tai93_bounds(&conv);

    let mut source = MemorySource::new();
    source.insert(
        "/Time",
        f64s(vec![t0 - 60.0, t0, t0 + 300.0, t0 + 600.0, t0 + 900.0]),
    );
    let bounds = window_bounds(&source, "/Time", &window, &conv).unwrap();
    assert_eq!(bounds, SubsettingBounds::Rows { start: 1, end: 3 });
}

#[test]
fn test_quality_flag_unpack_writes_side_dataset() {
    let mut source = MemorySource::new();
    let path = "/RedBand/Data Fields/Red Radiance/RDQI";
    source
        .insert(path, Buffer::from_shape_vec(&[2, 2], vec![5u16, 6, 8, 13]).unwrap())
        .with_attribute(misr::SCALE_ATTRIBUTE, AttrValue::numbers(vec![2.5f32]));

    let decoder = detect_decoder(&source, path).unwrap().unwrap();
    assert!(matches!(decoder, Decoder::QualityFlag(_)));
    let mut ctx = context();
    unpack_dataset(&mut ctx, &source, path, "/", &decoder).unwrap();
    let dest = ctx.close().unwrap();

    let values = dest.dataset("/Red_Radiance").unwrap();
    assert_eq!(values.data.to_f64_vec(), vec![2.5, -999.0, 5.0, 7.5]);
    let positions = dest.dataset("/Red_Radiance_low_accuracy_pos").unwrap();
    assert_eq!(positions.data, Buffer::from_array(Array1::from(vec![0i32, 3]).into_dyn()));
}

#[test]
fn test_quality_flag_unpack_without_low_accuracy_writes_one_dataset() {
    let mut source = MemorySource::new();
    let path = "/GreenBand/Data Fields/Green Radiance/RDQI";
    source
        .insert(path, Buffer::from_shape_vec(&[3], vec![4u16, 8, 7]).unwrap())
        .with_attribute(misr::SCALE_ATTRIBUTE, AttrValue::numbers(vec![0.5f32]));

    let decoder = detect_decoder(&source, path).unwrap().unwrap();
    let mut ctx = context();
    unpack_dataset(&mut ctx, &source, path, "/", &decoder).unwrap();
    let dest = ctx.close().unwrap();

    assert_eq!(dest.object_count(), 1);
    assert_eq!(
        dest.dataset("/Green_Radiance").unwrap().data.to_f64_vec(),
        vec![0.5, 1.0, -999.0]
    );
    assert!(dest.dataset("/Green_Radiance_low_accuracy_pos").is_none());
}

#[test]
fn test_geometry_angles_are_detected_by_scale_factor() {
    let mut source = MemorySource::new();
    source
        .insert("/SensorZenith", Buffer::from_shape_vec(&[2], vec![-32767i16, 4500]).unwrap())
        .with_attribute("scale_factor", AttrValue::numbers(vec![0.01f64]));
    source
        .insert("/Height", Buffer::from_shape_vec(&[1], vec![12i32]).unwrap())
        .with_attribute("scale_factor", AttrValue::numbers(vec![1.0f64]));

    let decoder = detect_decoder(&source, "/SensorZenith").unwrap().unwrap();
    assert!(matches!(decoder, Decoder::Geometry(_)));
    assert!(detect_decoder(&source, "/Height").unwrap().is_none());

    let mut ctx = context();
    unpack_dataset(&mut ctx, &source, "/SensorZenith", "/", &decoder).unwrap();
    let out = ctx.destination().dataset("/SensorZenith").unwrap().data.to_f64_vec();
    assert_eq!(out[0], -999.0);
    assert!((out[1] - 45.0).abs() < 1e-4);
}

#[test]
fn test_single_radiance_scale_for_two_bands_is_fatal() {
    let mut source = MemorySource::new();
    let path = "/EV_250_RefSB";
    source
        .insert(path, Buffer::from_shape_vec(&[2, 2], vec![1u16, 2, 3, 4]).unwrap())
        .with_attribute(modis::RADIANCE_SCALES, AttrValue::numbers(vec![0.5f32]))
        .with_attribute(modis::RADIANCE_OFFSETS, AttrValue::numbers(vec![0.0f32]));
    let err = detect_decoder(&source, path).unwrap_err();
    assert!(matches!(err, RepackError::CalibrationMismatch { .. }));
}

#[test]
fn test_modis_radiance_unpack_with_band_dimension() {
    let mut source = MemorySource::new();
    let path = "/MODIS_SWATH_Type_L1B/Data Fields/EV_250_RefSB";
    source
        .insert(
            path,
            Buffer::from_shape_vec(&[2, 3], vec![10u16, 20, 65535, 10, 20, 65534]).unwrap(),
        )
        .with_dimension(0, "Band_250M:MODIS_SWATH_Type_L1B", None)
        .with_dimension(1, "40*nscans:MODIS_SWATH_Type_L1B", None)
        .with_attribute(modis::RADIANCE_SCALES, AttrValue::numbers(vec![0.5f32, 2.0]))
        .with_attribute(modis::RADIANCE_OFFSETS, AttrValue::numbers(vec![0.0f32, 5.0]));

    let decoder = detect_decoder(&source, path).unwrap().unwrap();
    let mut ctx = context();
    let handle = unpack_dataset(&mut ctx, &source, path, "/", &decoder).unwrap();
    let options = DimensionOptions {
        band_tables: true,
        ..Default::default()
    };
    let dims = copy_dimensions(&mut ctx, &source, path, &handle, &options).unwrap();
    assert_eq!(dims[0].name, "Band_250M_MODIS_SWATH_Type_L1B");
    let dest = ctx.close().unwrap();

    assert_eq!(
        dest.dataset("/EV_250_RefSB").unwrap().data.to_f64_vec(),
        vec![5.0, 10.0, -999.0, 10.0, 30.0, -998.0]
    );
    let bands = dest.dataset("/Band_250M_MODIS_SWATH_Type_L1B").unwrap();
    assert_eq!(bands.data.to_f64_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_calibration_count_mismatch_is_fatal() {
    let mut source = MemorySource::new();
    let path = "/EV_500_RefSB";
    source
        .insert(path, Buffer::from_shape_vec(&[3, 1], vec![1u16, 2, 3]).unwrap())
        .with_attribute(modis::RADIANCE_SCALES, AttrValue::numbers(vec![1.0f32, 1.0]))
        .with_attribute(modis::RADIANCE_OFFSETS, AttrValue::numbers(vec![0.0f32, 0.0]));
    let err = detect_decoder(&source, path).unwrap_err();
    assert!(matches!(err, RepackError::CalibrationMismatch { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_aster_zero_is_fill_under_any_scale() {
    let mut source = MemorySource::new();
    source.insert(
        "/TIR/ImageData10",
        Buffer::from_shape_vec(&[1, 3], vec![0u16, 2, 4095]).unwrap(),
    );
    for coefficient in [0.006822f32, 1.0, 100.0] {
        let calibration = aster::calibration(coefficient, aster::TIR_MAX);
        let decoder = Decoder::Linear(LinearUnpack::new(calibration));
        let mut ctx = context();
        unpack_dataset(&mut ctx, &source, "/TIR/ImageData10", "/", &decoder).unwrap();
        let out = ctx.destination().dataset("/ImageData10").unwrap().data.to_f64_vec();
        assert_eq!(out[0], -999.0);
        assert_eq!(out[2], -998.0);
    }
}

#[test]
fn test_geometry_unpack() {
    let mut source = MemorySource::new();
    source.insert(
        "/SolarZenith",
        Buffer::from_shape_vec(&[2], vec![-32767i16, 1000]).unwrap(),
    );
    let mut ctx = context();
    let decoder = Decoder::Geometry(GeometryScaleUnpack::default());
    unpack_dataset(&mut ctx, &source, "/SolarZenith", "/", &decoder).unwrap();
    let out = ctx.destination().dataset("/SolarZenith").unwrap().data.to_f64_vec();
    assert_eq!(out[0], -999.0);
    assert!((out[1] - 10.0).abs() < 1e-4);
}

#[test]
fn test_time_dataset_is_converted_with_units() {
    let conv = CalendarConverter::new(&LEAP_SECONDS);
    let day = 86_400.0;
    let mut source = MemorySource::new();
    source.insert("/Geo/Time", f64s(vec![0.0, 200.0 * day, 9000.0 * day]));

    let mut ctx = context();
    let handle = convert_time_dataset(&mut ctx, &source, "/Geo/Time", "/", &conv, None).unwrap();
    let dest = ctx.close().unwrap();

    let time = dest.object(handle.id).unwrap();
    assert_eq!(
        time.data.to_f64_vec(),
        vec![0.0, 200.0 * day - 1.0, 9000.0 * day - 10.0]
    );
    assert_eq!(time.attributes.get("units"), Some(&AttrValue::from(TIME_UNITS)));
}

#[test]
fn test_time_dataset_must_be_double() {
    let mut source = MemorySource::new();
    source.insert("/Time", Buffer::from_shape_vec(&[1], vec![1.0f32]).unwrap());
    let mut ctx = context();
    let conv = CalendarConverter::global();
    let err = convert_time_dataset(&mut ctx, &source, "/Time", "/", conv, None).unwrap_err();
    assert!(matches!(err, RepackError::TypeUnsupported(_)));
}

#[test]
fn test_groups_and_attributes() {
    let mut source = MemorySource::new();
    source
        .insert("/Radiance", Buffer::from_shape_vec(&[1], vec![1u8]).unwrap())
        .with_attribute("units", AttrValue::from("W/m^2/sr/um"))
        .with_attribute("valid_range", AttrValue::numbers(vec![0u8, 254]));

    let mut ctx = context();
    let group = create_group(&mut ctx, "/", "MOPITT").unwrap();
    let granule = create_group(&mut ctx, &group, "granule 1").unwrap();
    assert_eq!(granule, "/MOPITT/granule_1");
    set_string_attribute(&mut ctx, Target::Group(&granule), "GranuleTime", "2020-01-01T00:00:00Z")
        .unwrap();
    let handle = copy_dataset(&mut ctx, &source, "/Radiance", &granule).unwrap();
    assert_eq!(
        copy_attributes(&mut ctx, &source, "/Radiance", Target::Object(handle.id)).unwrap(),
        2
    );
    let dest = ctx.close().unwrap();

    assert!(dest.has_group("/MOPITT/granule_1"));
    assert_eq!(
        dest.group_attribute("/MOPITT/granule_1", "GranuleTime"),
        Some(&AttrValue::from("2020-01-01T00:00:00Z"))
    );
    let radiance = dest.dataset("/MOPITT/granule_1/Radiance").unwrap();
    assert_eq!(radiance.attributes.len(), 2);
}

#[test]
fn test_duplicate_dataset_in_group_is_rejected() {
    let mut source = MemorySource::new();
    source.insert("/a/Radiance", Buffer::from_shape_vec(&[1], vec![1u8]).unwrap());
    source.insert("/b/Radiance", Buffer::from_shape_vec(&[1], vec![2u8]).unwrap());
    let mut ctx = context();
    copy_dataset(&mut ctx, &source, "/a/Radiance", "/").unwrap();
    let err = copy_dataset(&mut ctx, &source, "/b/Radiance", "/").unwrap_err();
    assert!(matches!(err, RepackError::DuplicateName { .. }));
}

#[test]
fn test_chunked_compressed_layout() {
    let options = WriteOptions {
        chunked: true,
        compression_level: 6,
    };
    let mut ctx = Context::create(MemoryDestination::new(), options).unwrap();
    let mut source = MemorySource::new();
    source.insert("/Grid", Buffer::from_array(ArrayD::<f64>::zeros(IxDyn(&[4, 5, 6]))));
    copy_dataset(&mut ctx, &source, "/Grid", "/").unwrap();
    let layout = &ctx.destination().dataset("/Grid").unwrap().layout;
    assert_eq!(layout.chunk, Some(vec![4, 5, 6]));
    assert_eq!(layout.compression_level, 6);
}
