/*++

Licensed under the Apache-2.0 license.

File Name:

    register.rs

Abstract:

    File contains implementation of various register types used by peripherals

--*/

use crate::BusError;
use ecmm_emu_types::{EmuData, EmuSize};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::InMemoryRegister;
use tock_registers::{LocalRegisterCopy, RegisterLongName, UIntLike};

/// Implemented by arrays of registers that can be dispatched to by
/// `#[register_array]` fields in `#[derive(Bus)]` structs.
pub trait RegisterArray {
    const ITEM_SIZE: usize;
    const LEN: usize;
}
impl<const LEN: usize, T: Register> RegisterArray for [T; LEN] {
    const ITEM_SIZE: usize = T::SIZE;
    const LEN: usize = LEN;
}

pub trait Register {
    /// Size of the register in bytes.
    const SIZE: usize;

    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&self, size: EmuSize) -> Result<EmuData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError>;
}

/// Emu Data Conversion Trait
trait EmuDataConverter<T: UIntLike> {
    /// Convert `EmuData` to type `T`
    ///
    /// # Arguments
    ///
    /// * `val` - Data to convert
    ///
    /// # Returns
    ///
    /// * `T` - The converted value
    fn from(val: EmuData) -> T;

    /// Convert `T` to type `EmuData`
    ///
    /// # Arguments
    ///
    /// * `val` - Data to convert
    ///
    /// # Returns
    ///
    /// * `EmuData` - The converted value
    fn to(val: T) -> EmuData;
}

impl EmuDataConverter<u8> for u8 {
    /// Convert `EmuData` to type `u8`
    fn from(val: EmuData) -> u8 {
        (val & u8::MAX as EmuData) as u8
    }

    /// Convert `u8` to type `EmuData`
    fn to(val: u8) -> EmuData {
        val as EmuData
    }
}

impl EmuDataConverter<u16> for u16 {
    /// Convert `EmuData` to type `u16`
    fn from(val: EmuData) -> u16 {
        (val & u16::MAX as EmuData) as u16
    }

    /// Convert `u16` to type `EmuData`
    fn to(val: u16) -> EmuData {
        val as EmuData
    }
}

impl EmuDataConverter<u32> for u32 {
    /// Convert `EmuData` to type `u32`
    fn from(val: EmuData) -> u32 {
        val
    }

    /// Convert `u32` to type `EmuData`
    fn to(val: u32) -> EmuData {
        val
    }
}

impl Register for u8 {
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Read data of specified size from given address
    fn read(&self, size: EmuSize) -> Result<EmuData, BusError> {
        match size {
            EmuSize::Byte => Ok(u8::to(*self)),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    /// Write data of specified size to given address
    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        match size {
            EmuSize::Byte => {
                *self = val as u8;
                Ok(())
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }
}
impl Register for u16 {
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Read data of specified size from given address
    fn read(&self, size: EmuSize) -> Result<EmuData, BusError> {
        match size {
            EmuSize::HalfWord => Ok(u16::to(*self)),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    /// Write data of specified size to given address
    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        match size {
            EmuSize::HalfWord => {
                *self = val as u16;
                Ok(())
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }
}

impl Register for u32 {
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Read data of specified size from given address
    fn read(&self, size: EmuSize) -> Result<EmuData, BusError> {
        match size {
            EmuSize::Word => Ok(u32::to(*self)),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    /// Write data of specified size to given address
    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        match size {
            EmuSize::Word => {
                *self = val;
                Ok(())
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }
}

impl<T: UIntLike + Register, R: RegisterLongName> Register for LocalRegisterCopy<T, R> {
    const SIZE: usize = T::SIZE;

    fn read(&self, size: EmuSize) -> Result<EmuData, BusError> {
        Register::read(&self.get(), size)
    }

    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        let mut tmp = T::zero();
        Register::write(&mut tmp, size, val)?;
        self.set(tmp);
        Ok(())
    }
}

/// Read Write Register
pub struct ReadWriteRegister<T: UIntLike, R: RegisterLongName = ()> {
    /// Register
    pub reg: InMemoryRegister<T, R>,
}

impl<T: UIntLike, R: RegisterLongName> ReadWriteRegister<T, R> {
    /// Create an instance of Read Write Register
    pub fn new(val: T) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<T: UIntLike + EmuDataConverter<T>, R: RegisterLongName> Register for ReadWriteRegister<T, R> {
    const SIZE: usize = std::mem::size_of::<T>();

    /// Read data of specified size from given address
    fn read(&self, size: EmuSize) -> Result<EmuData, BusError> {
        if std::mem::size_of::<T>() != size.into() {
            Err(BusError::LoadAccessFault)?
        }

        Ok(T::to(self.reg.get()))
    }

    /// Write data of specified size to given address
    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        if std::mem::size_of::<T>() != size.into() {
            Err(BusError::StoreAccessFault)?
        }

        self.reg.set(T::from(val));

        Ok(())
    }
}

/// Read Only Register
pub struct ReadOnlyRegister<T: UIntLike, R: RegisterLongName = ()> {
    /// Register
    pub reg: InMemoryRegister<T, R>,
}

impl<T: UIntLike, R: RegisterLongName> ReadOnlyRegister<T, R> {
    /// Create an instance of Read Only Register
    pub fn new(val: T) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<T: UIntLike + EmuDataConverter<T>, R: RegisterLongName> Register for ReadOnlyRegister<T, R>
where
    EmuData: From<T>,
{
    const SIZE: usize = std::mem::size_of::<T>();

    /// Read data of specified size from given address
    fn read(&self, size: EmuSize) -> Result<EmuData, BusError> {
        if std::mem::size_of::<T>() != size.into() {
            Err(BusError::LoadAccessFault)?
        }

        Ok(T::to(self.reg.get()))
    }

    /// Write data of specified size to given address
    fn write(&mut self, _size: EmuSize, _val: EmuData) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }
}

/// Write Only Register
pub struct WriteOnlyRegister<T: UIntLike, R: RegisterLongName = ()> {
    pub reg: InMemoryRegister<T, R>,
}

impl<T: UIntLike, R: RegisterLongName> WriteOnlyRegister<T, R> {
    /// Create an instance of Write Only Register
    pub fn new(val: T) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<T: UIntLike + EmuDataConverter<T>, R: RegisterLongName> Register for WriteOnlyRegister<T, R>
where
    EmuData: From<T>,
{
    const SIZE: usize = std::mem::size_of::<T>();

    /// Read data of specified size from given address
    fn read(&self, _size: EmuSize) -> Result<EmuData, BusError> {
        Err(BusError::LoadAccessFault)?
    }

    /// Write data of specified size to given address
    fn write(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        if std::mem::size_of::<T>() != size.into() {
            Err(BusError::StoreAccessFault)?
        }

        self.reg.set(T::from(val));

        Ok(())
    }
}
