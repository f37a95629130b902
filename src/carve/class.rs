//! # Class-File Layout
//!
//! Walks a JVM class-file image in place and reports how many bytes it
//! occupies. Nothing beyond what is needed to find the end of the structure
//! is interpreted: constant-pool entries are decoded only so UTF-8 entries
//! can label attributes.

use crate::carve::Reject;
use crate::carve::cursor::Cursor;

pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef {
    pub class: u16,
    pub name_and_type: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicRef {
    pub bootstrap_method: u16,
    pub name_and_type: u16,
}

/// One constant-pool entry, discriminated by its tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant<'a> {
    Utf8(&'a [u8]),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class { name: u16 },
    String { value: u16 },
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic(DynamicRef),
    InvokeDynamic(DynamicRef),
    Module { name: u16 },
    Package { name: u16 },
    /// Tag this parser does not know; it occupies no bytes after the tag.
    Unknown(u8),
}

impl<'a> Constant<'a> {
    fn read(cur: &mut Cursor<'a>) -> Result<Self, Reject> {
        let constant = match cur.u8()? {
            tag::UTF8 => {
                let len = cur.u16()?;
                Constant::Utf8(cur.take(usize::from(len))?)
            }
            tag::INTEGER => Constant::Integer(cur.u32()?),
            tag::FLOAT => Constant::Float(cur.u32()?),
            tag::LONG => Constant::Long(cur.u64()?),
            tag::DOUBLE => Constant::Double(cur.u64()?),
            tag::CLASS => Constant::Class { name: cur.u16()? },
            tag::STRING => Constant::String { value: cur.u16()? },
            tag::METHOD_TYPE => Constant::MethodType {
                descriptor: cur.u16()?,
            },
            tag::MODULE => Constant::Module { name: cur.u16()? },
            tag::PACKAGE => Constant::Package { name: cur.u16()? },
            tag::FIELD_REF => Constant::FieldRef(member_ref(cur)?),
            tag::METHOD_REF => Constant::MethodRef(member_ref(cur)?),
            tag::INTERFACE_METHOD_REF => Constant::InterfaceMethodRef(member_ref(cur)?),
            tag::NAME_AND_TYPE => Constant::NameAndType {
                name: cur.u16()?,
                descriptor: cur.u16()?,
            },
            tag::DYNAMIC => Constant::Dynamic(dynamic_ref(cur)?),
            tag::INVOKE_DYNAMIC => Constant::InvokeDynamic(dynamic_ref(cur)?),
            tag::METHOD_HANDLE => Constant::MethodHandle {
                kind: cur.u8()?,
                reference: cur.u16()?,
            },
            other => Constant::Unknown(other),
        };
        Ok(constant)
    }

    /// Long and double entries also occupy the following pool index.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

fn member_ref(cur: &mut Cursor<'_>) -> Result<MemberRef, Reject> {
    Ok(MemberRef {
        class: cur.u16()?,
        name_and_type: cur.u16()?,
    })
}

fn dynamic_ref(cur: &mut Cursor<'_>) -> Result<DynamicRef, Reject> {
    Ok(DynamicRef {
        bootstrap_method: cur.u16()?,
        name_and_type: cur.u16()?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    /// Index 0, never assigned.
    Empty,
    Entry(Constant<'a>),
    /// Index following a long or double. Holds no data of its own.
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool<'a> {
    slots: Vec<Slot<'a>>,
}

impl<'a> ConstantPool<'a> {
    fn read(cur: &mut Cursor<'a>, count: u16) -> Result<Self, Reject> {
        let count = usize::from(count);
        let mut slots = vec![Slot::Empty];
        while slots.len() < count {
            let constant = Constant::read(cur)?;
            slots.push(Slot::Entry(constant));
            if constant.is_wide() && slots.len() < count {
                slots.push(Slot::Reserved);
            }
        }
        Ok(Self { slots })
    }

    /// Number of slots, including the unused index 0.
    pub fn count(&self) -> usize {
        self.slots.len().max(1)
    }

    pub fn slot(&self, index: u16) -> Option<&Slot<'a>> {
        self.slots.get(usize::from(index))
    }

    pub fn get(&self, index: u16) -> Option<&Constant<'a>> {
        match self.slot(index)? {
            Slot::Entry(constant) => Some(constant),
            Slot::Empty | Slot::Reserved => None,
        }
    }

    /// UTF-8 text at `index`, or `None` for any other kind of slot.
    pub fn utf8(&self, index: u16) -> Option<&'a str> {
        match self.get(index)? {
            Constant::Utf8(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Empty when the name index does not resolve to UTF-8 text.
    pub name: &'a str,
    pub info: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member<'a> {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute<'a>>,
}

fn read_attributes<'a>(
    cur: &mut Cursor<'a>,
    pool: &ConstantPool<'a>,
) -> Result<Vec<Attribute<'a>>, Reject> {
    let count = cur.u16()?;
    let mut attributes = Vec::new();
    for _ in 0..count {
        let name_index = cur.u16()?;
        let len = usize::try_from(cur.u32()?).map_err(|_| Reject::Oversized)?;
        let info = cur.take(len)?;
        attributes.push(Attribute {
            name: pool.utf8(name_index).unwrap_or_default(),
            info,
        });
    }
    Ok(attributes)
}

fn read_members<'a>(
    cur: &mut Cursor<'a>,
    pool: &ConstantPool<'a>,
) -> Result<Vec<Member<'a>>, Reject> {
    let count = cur.u16()?;
    let mut members = Vec::new();
    for _ in 0..count {
        members.push(Member {
            access_flags: cur.u16()?,
            name_index: cur.u16()?,
            descriptor_index: cur.u16()?,
            attributes: read_attributes(cur, pool)?,
        });
    }
    Ok(members)
}

/// A class-file image parsed in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLayout<'a> {
    pub minor_version: u16,
    pub major_version: u16,
    pub pool: ConstantPool<'a>,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interface_count: u16,
    pub fields: Vec<Member<'a>>,
    pub methods: Vec<Member<'a>>,
    pub attributes: Vec<Attribute<'a>>,
    /// Bytes occupied from the start offset through the last attribute.
    pub length: usize,
}

impl<'a> ClassLayout<'a> {
    /// Parse the image starting at `offset`. `header` is the magic the image
    /// must begin with; parsing of the body starts right after it.
    pub fn parse(
        buf: &'a [u8],
        offset: usize,
        header: &[u8],
        max_len: usize,
    ) -> Result<Self, Reject> {
        let mut cur = Cursor::new(buf, offset, max_len);
        if cur.take(header.len())? != header {
            return Err(Reject::HeaderMismatch);
        }

        let minor_version = cur.u16()?;
        let major_version = cur.u16()?;
        let pool_count = cur.u16()?;
        let pool = ConstantPool::read(&mut cur, pool_count)?;

        let access_flags = cur.u16()?;
        let this_class = cur.u16()?;
        let super_class = cur.u16()?;

        let interface_count = cur.u16()?;
        cur.skip(usize::from(interface_count) * 2)?;

        let fields = read_members(&mut cur, &pool)?;
        let methods = read_members(&mut cur, &pool)?;
        let attributes = read_attributes(&mut cur, &pool)?;

        Ok(Self {
            minor_version,
            major_version,
            pool,
            access_flags,
            this_class,
            super_class,
            interface_count,
            fields,
            methods,
            attributes,
            length: cur.consumed(),
        })
    }
}

/// Exact byte length of the class image at `offset`, or why it was rejected.
pub fn measure(buf: &[u8], offset: usize, header: &[u8], max_len: usize) -> Result<usize, Reject> {
    ClassLayout::parse(buf, offset, header, max_len).map(|layout| layout.length)
}
