//! The public client API: one call per operation, built on the
//! demultiplexer so many threads can share a single connection.

mod demux;

use crate::constants::{NORMAL_TIMEOUT, WAIT_TIMEOUT};
use crate::error::Error;
use crate::net::split;
use crate::protocol::codec::{write_double, write_int, write_utf};
use crate::protocol::op::{self, decode_filter_response};
use crate::protocol::{OpCode, STATUS_OK};
use crate::sale::Sale;
use demux::Demux;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

pub struct Client {
    demux: Demux,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| Error::Protocol(format!("failed to connect: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| Error::Protocol(format!("failed to set TCP_NODELAY: {e}")))?;
        let (writer, reader) = split(stream)?;
        Ok(Client {
            demux: Demux::new(writer, reader),
        })
    }

    fn call(&self, op: OpCode, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, Error> {
        let frame = self.demux.call(op.as_i32(), payload, timeout)?;
        if frame.kind == STATUS_OK {
            Ok(frame.payload)
        } else {
            let message = String::from_utf8_lossy(&frame.payload).into_owned();
            Err(Error::Protocol(message))
        }
    }

    pub fn register(&self, user: &str, pass: &str) -> Result<bool, Error> {
        let mut payload = Vec::new();
        write_utf(&mut payload, user).unwrap();
        write_utf(&mut payload, pass).unwrap();
        let response = self.call(OpCode::Register, payload, NORMAL_TIMEOUT)?;
        op::decode_bool(&response)
    }

    pub fn login(&self, user: &str, pass: &str) -> Result<bool, Error> {
        let mut payload = Vec::new();
        write_utf(&mut payload, user).unwrap();
        write_utf(&mut payload, pass).unwrap();
        let response = self.call(OpCode::Login, payload, NORMAL_TIMEOUT)?;
        op::decode_bool(&response)
    }

    pub fn add_event(&self, product: &str, quantity: i32, price: f64) -> Result<(), Error> {
        let mut payload = Vec::new();
        write_utf(&mut payload, product).unwrap();
        write_int(&mut payload, quantity).unwrap();
        write_double(&mut payload, price).unwrap();
        self.call(OpCode::AddEvent, payload, NORMAL_TIMEOUT)?;
        Ok(())
    }

    pub fn new_day(&self) -> Result<(), Error> {
        self.call(OpCode::NewDay, Vec::new(), NORMAL_TIMEOUT)?;
        Ok(())
    }

    fn aggregate(&self, op_code: OpCode, product: &str, days: i32) -> Result<f64, Error> {
        let mut payload = Vec::new();
        write_utf(&mut payload, product).unwrap();
        write_int(&mut payload, days).unwrap();
        let response = self.call(op_code, payload, NORMAL_TIMEOUT)?;
        op::decode_double(&response)
    }

    pub fn aggregate_qty(&self, product: &str, days: i32) -> Result<f64, Error> {
        self.aggregate(OpCode::AggrQty, product, days)
    }

    pub fn aggregate_volume(&self, product: &str, days: i32) -> Result<f64, Error> {
        self.aggregate(OpCode::AggrVol, product, days)
    }

    pub fn aggregate_avg(&self, product: &str, days: i32) -> Result<f64, Error> {
        self.aggregate(OpCode::AggrAvg, product, days)
    }

    pub fn aggregate_max(&self, product: &str, days: i32) -> Result<f64, Error> {
        self.aggregate(OpCode::AggrMax, product, days)
    }

    pub fn filter(&self, day: i32, products: &[String]) -> Result<Vec<Sale>, Error> {
        let mut payload = Vec::new();
        write_int(&mut payload, day).unwrap();
        write_int(&mut payload, products.len() as i32).unwrap();
        for product in products {
            write_utf(&mut payload, product).unwrap();
        }
        let response = self.call(OpCode::Filter, payload, NORMAL_TIMEOUT)?;
        decode_filter_response(&response)
    }

    pub fn wait_simultaneous(&self, product_a: &str, product_b: &str) -> Result<bool, Error> {
        let mut payload = Vec::new();
        write_utf(&mut payload, product_a).unwrap();
        write_utf(&mut payload, product_b).unwrap();
        let response = self.call(OpCode::WaitSimul, payload, WAIT_TIMEOUT)?;
        op::decode_bool(&response)
    }

    pub fn wait_consecutive(&self, n: i32) -> Result<Option<String>, Error> {
        let mut payload = Vec::new();
        write_int(&mut payload, n).unwrap();
        let response = self.call(OpCode::WaitConsec, payload, WAIT_TIMEOUT)?;
        op::decode_optional_utf(&response)
    }

    pub fn get_current_day(&self) -> Result<i32, Error> {
        let response = self.call(OpCode::GetCurrentDay, Vec::new(), NORMAL_TIMEOUT)?;
        op::decode_int(&response)
    }
}
