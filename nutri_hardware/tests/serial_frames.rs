use nutri_hardware::SerialScale;
use nutri_hardware::error::HwError;
use nutri_traits::WeightSensor;
use std::io::Write;
use std::time::Duration;

const T: Duration = Duration::from_millis(500);

#[test]
fn file_frames_are_parsed_then_eof_disconnects() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "ST,GS,+ 150.2g").unwrap();
    writeln!(f, "garbage").unwrap();
    writeln!(f).unwrap();
    writeln!(f, "149.9").unwrap();
    f.flush().unwrap();

    let mut s = SerialScale::open(f.path()).unwrap();
    assert_eq!(s.read(T).unwrap(), 150.2);
    assert_eq!(s.read(T).unwrap(), 149.9);
    let err = s.read(T).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::Disconnected(_))
    ));

    // Reopening starts from the top of the device again.
    s.reconnect().unwrap();
    assert_eq!(s.read(T).unwrap(), 150.2);
}

#[test]
fn missing_device_fails_to_open() {
    let err = SerialScale::open("/nonexistent/rfcomm9").err().unwrap();
    assert!(matches!(err, HwError::Disconnected(_)));
}

#[cfg(unix)]
#[test]
fn quiet_stream_times_out_without_disconnecting() {
    let (reader, mut writer) = std::os::unix::net::UnixStream::pair().unwrap();
    let mut s = SerialScale::from_reader("pipe", std::io::BufReader::new(reader));
    let err = s.read(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Timeout)));

    writeln!(writer, "12.5").unwrap();
    assert_eq!(s.read(T).unwrap(), 12.5);
    assert!(s.reconnect().is_err());
}

#[test]
fn absent_device_starts_disconnected_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rfcomm0");
    let mut s = SerialScale::open_or_wait(&path);
    let err = s.read(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::Disconnected(_))
    ));
    assert!(s.reconnect().is_err());

    std::fs::write(&path, "88.0\n").unwrap();
    s.reconnect().unwrap();
    assert_eq!(s.read(T).unwrap(), 88.0);
}
