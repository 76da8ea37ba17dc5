use core::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use postcard::{
    from_bytes_cobs,
    ser_flavors::{Cobs, Slice},
    serialize_with_flavor,
};

pub const SERIALIZE_BUFFER_SIZE: usize = 128;

pub trait DataPointLogger<T> {
    fn log_data_point(&mut self, data_point: &T);
    fn get_bytes_logged(&self) -> u32;
    fn set_logging_enabled(&mut self, enabled: bool);

    /// Push out anything buffered short of a full page.
    fn flush(&mut self) {}
}

/// Where full pages of frames end up.
pub trait FrameSink {
    fn write_page(&mut self, page: &[u8]);
}

impl<F: FnMut(&[u8])> FrameSink for F {
    fn write_page(&mut self, page: &[u8]) {
        self(page)
    }
}

/// Packs COBS framed data points into a page and hands full pages to
/// `sink`, usually a serial port. Frames are zero terminated
/// so a reader can resync at any 0x00 byte.
pub struct SerialFrameLogger<T, F, const PAGE_SIZE: usize> {
    page: [u8; PAGE_SIZE],
    page_index: usize,
    logging_enabled: bool,
    bytes_logged: u32,
    dropped_data_points: u32,
    sink: F,
    _marker: PhantomData<T>,
}

impl<T, F, const PAGE_SIZE: usize> DataPointLogger<T> for SerialFrameLogger<T, F, PAGE_SIZE>
where
    T: Serialize,
    F: FrameSink,
{
    fn log_data_point(&mut self, data_point: &T) {
        if !self.logging_enabled {
            return;
        }

        let mut data_buffer = [0u8; SERIALIZE_BUFFER_SIZE];
        let serialized_size = match serialize_data_point(data_point, &mut data_buffer) {
            Some(size) if size <= PAGE_SIZE => size,
            _ => {
                self.dropped_data_points += 1;
                return;
            }
        };

        if self.page_index + serialized_size > PAGE_SIZE {
            self.flush();
        }

        self.page[self.page_index..self.page_index + serialized_size]
            .copy_from_slice(&data_buffer[..serialized_size]);
        self.page_index += serialized_size;
        self.bytes_logged += serialized_size as u32;

        if self.page_index == PAGE_SIZE {
            self.flush();
        }
    }

    fn get_bytes_logged(&self) -> u32 {
        self.bytes_logged
    }

    fn set_logging_enabled(&mut self, enabled: bool) {
        self.logging_enabled = enabled;
    }

    fn flush(&mut self) {
        if self.page_index > 0 {
            self.sink.write_page(&self.page[..self.page_index]);
            self.page_index = 0;
        }
    }
}

impl<T, F, const PAGE_SIZE: usize> SerialFrameLogger<T, F, PAGE_SIZE>
where
    T: Serialize,
    F: FrameSink,
{
    pub fn new(sink: F) -> Self {
        Self {
            page: [0_u8; PAGE_SIZE],
            page_index: 0,
            logging_enabled: false,
            bytes_logged: 0,
            dropped_data_points: 0,
            sink,
            _marker: PhantomData {},
        }
    }

    pub fn pending_bytes(&self) -> usize {
        self.page_index
    }

    pub fn dropped_data_points(&self) -> u32 {
        self.dropped_data_points
    }
}

/// Pull the next frame off a byte stream. Consumes bytes up to and including
/// the frame's zero terminator.
pub fn retrieve_data_point<'b, T: DeserializeOwned>(
    buffer: &mut dyn Iterator<Item = &'b u8>,
) -> Option<T> {
    let mut working_buffer = [0u8; SERIALIZE_BUFFER_SIZE];
    let mut size = 0;

    loop {
        let byte = *buffer.next()?;
        if size >= SERIALIZE_BUFFER_SIZE {
            return None;
        }

        working_buffer[size] = byte;
        size += 1;

        if byte == 0 {
            break;
        }
    }

    from_bytes_cobs(&mut working_buffer[0..size]).ok()
}

fn serialize_data_point<T: Serialize>(data: &T, buffer: &mut [u8]) -> Option<usize> {
    match Cobs::try_new(Slice::new(buffer)) {
        Ok(flavor) => {
            let serialized = serialize_with_flavor::<T, Cobs<Slice>, &mut [u8]>(data, flavor);

            match serialized {
                Ok(output_buffer) => Some(output_buffer.len()),
                Err(_) => None,
            }
        }
        Err(_) => None,
    }
}

pub struct DataPointLoggerMock;

impl<T> DataPointLogger<T> for DataPointLoggerMock {
    fn log_data_point(&mut self, _data_point: &T) {}
    fn get_bytes_logged(&self) -> u32 { 0 }
    fn set_logging_enabled(&mut self, _enabled: bool) {}
}

#[cfg(test)]
pub mod tests {
    use std::{cell::RefCell, vec::Vec};

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub enum TestDataPoint {
        Data0 { data0: u8, data1: u8 },
        Data1 { data0: u16, data1: u8, data2: u8 },
        Data2 { data0: u32 },
    }

    fn test_data_points() -> [TestDataPoint; 5] {
        [
            TestDataPoint::Data0 {
                data0: 42,
                data1: 37,
            },
            TestDataPoint::Data1 {
                data0: 310,
                data1: 0,
                data2: 255,
            },
            TestDataPoint::Data2 { data0: 0x12345678 },
            TestDataPoint::Data0 {
                data0: 17,
                data1: 84,
            },
            TestDataPoint::Data2 { data0: 0x87654321 },
        ]
    }

    #[test]
    fn test_frames_survive_paging() {
        const PAGE_SIZE: usize = 16;
        let stream = RefCell::new(Vec::new());
        let data_points = test_data_points();

        let mut logger = SerialFrameLogger::<TestDataPoint, _, PAGE_SIZE>::new(|page: &[u8]| {
            assert!(page.len() <= PAGE_SIZE);
            stream.borrow_mut().extend_from_slice(page);
        });
        logger.set_logging_enabled(true);

        for data_point in &data_points {
            logger.log_data_point(data_point);
        }
        logger.flush();
        assert_eq!(logger.pending_bytes(), 0);
        assert_eq!(logger.dropped_data_points(), 0);
        assert_eq!(logger.get_bytes_logged() as usize, stream.borrow().len());

        let stream = stream.borrow();
        let mut iter = stream.iter();
        for data_point in &data_points {
            let retrieved: TestDataPoint = retrieve_data_point(&mut iter).unwrap();
            assert_eq!(&retrieved, data_point);
        }
        assert!(retrieve_data_point::<TestDataPoint>(&mut iter).is_none());
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let mut flushed = 0;
        let mut logger = SerialFrameLogger::<TestDataPoint, _, 32>::new(|_page: &[u8]| {
            flushed += 1;
        });

        for data_point in &test_data_points() {
            logger.log_data_point(data_point);
        }
        logger.flush();

        assert_eq!(logger.get_bytes_logged(), 0);
        drop(logger);
        assert_eq!(flushed, 0);
    }

    #[test]
    fn test_oversized_frames_are_dropped() {
        let mut logger = SerialFrameLogger::<TestDataPoint, _, 4>::new(|_page: &[u8]| {});
        logger.set_logging_enabled(true);

        logger.log_data_point(&TestDataPoint::Data2 { data0: 0xFFFFFFFF });

        assert_eq!(logger.dropped_data_points(), 1);
        assert_eq!(logger.get_bytes_logged(), 0);
    }
}
