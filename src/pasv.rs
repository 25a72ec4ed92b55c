// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Parsing the handful of structured server replies the library cares about: `PASV`'s six-tuple,
//! `SIZE`'s numeric operand, and `PWD`'s quoted path.

use nom::{
    bytes::complete::{tag, take_until},
    character::complete::{char, digit1, space1},
    combinator::map_res,
    sequence::{preceded, separated_pair, tuple},
    IResult,
};

use std::net::{Ipv4Addr, SocketAddrV4};

fn number(input: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse)(input)
}

fn sextuple(input: &str) -> IResult<&str, (u16, u16, u16, u16, u16, u16)> {
    tuple((
        number,
        preceded(char(','), number),
        preceded(char(','), number),
        preceded(char(','), number),
        preceded(char(','), number),
        preceded(char(','), number),
    ))(input)
}

/// Parse a `PASV` reply (e.g. `227 Entering Passive Mode (127,0,0,1,200,10)` or the more
/// permissive `227 =(10,0,0,5,4,210).`) into the endpoint the client should connect to.
///
/// Scans from the first `(`, so leading garbage before it (a stray `=`, the rest of the
/// human-readable sentence) is ignored; anything that isn't exactly six comma-separated unsigned
/// integers is a hard error.
pub(crate) fn parse_pasv_reply(response: &str) -> crate::Result<SocketAddrV4> {
    let open = response
        .find('(')
        .ok_or_else(|| crate::Error::Malformed(format!("no '(' in PASV reply: {response}")))?;

    let (_, (h1, h2, h3, h4, p1, p2)) = sextuple(&response[open + 1..])
        .map_err(|_| crate::Error::Malformed(format!("bad PASV sextuple: {response}")))?;

    for octet in [h1, h2, h3, h4] {
        if octet > 255 {
            return Err(crate::Error::Malformed(format!(
                "host octet out of range in PASV reply: {response}"
            )));
        }
    }
    for octet in [p1, p2] {
        if octet > 255 {
            return Err(crate::Error::Malformed(format!(
                "port octet out of range in PASV reply: {response}"
            )));
        }
    }

    let ip = Ipv4Addr::new(h1 as u8, h2 as u8, h3 as u8, h4 as u8);
    let port = (p1 << 8) | p2;
    Ok(SocketAddrV4::new(ip, port))
}

/// Render the `PORT h1,h2,h3,h4,p1,p2` command operand for an active-mode listener bound at
/// `addr`.
pub(crate) fn format_port_command(addr: SocketAddrV4) -> String {
    let octets = addr.ip().octets();
    let port = addr.port();
    format!(
        "PORT {},{},{},{},{},{}",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port >> 8,
        port & 0xff
    )
}

/// Extract the `"<size>"`-shaped numeric operand out of a `SIZE` reply's `"<code> <size>"` body.
pub(crate) fn parse_size_reply(response: &str) -> crate::Result<u64> {
    let parse_pair = separated_pair(digit1::<&str, ()>, space1, digit1);
    let (_, (_, size)) = parse_pair(response)
        .map_err(|_| crate::Error::Malformed(format!("bad SIZE reply: {response}")))?;
    size.parse()
        .map_err(|_| crate::Error::Malformed(format!("bad SIZE reply: {response}")))
}

/// Extract the quoted path out of a `PWD` reply, e.g. `257 "/home/user" is the current directory`.
pub(crate) fn parse_pwd_reply(response: &str) -> crate::Result<String> {
    let (_, path) = preceded(take_until::<_, _, ()>("\""), preceded(tag("\""), take_until("\"")))(
        response,
    )
    .map_err(|_| crate::Error::Malformed(format!("no quoted path in PWD reply: {response}")))?;
    Ok(path.to_string())
}
